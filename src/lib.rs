//! Speedtest Pusher
//!
//! Watches the result file written by a speedtest run and, on its first
//! modification, pushes download, upload and ping gauges to a Prometheus
//! Pushgateway. One run pushes at most once.

pub mod app;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod pusher;
pub mod watcher;

// Re-export commonly used types
pub use app::{RunLoop, RunOutcome};
pub use controller::{FileChangeHandler, WatchController, WatchState};
pub use error::{AppError, Result};
pub use metrics::MetricSet;
pub use models::{RunOptions, SpeedTestResult};
pub use parser::ResultParser;
pub use pusher::{Delivery, PushGatewayClient};
pub use watcher::{EventSource, FileEvent, NotifySource, SubscriptionHandle};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_JOB_NAME: &str = "speedtest";
    /// Upper bound for a single Pushgateway request
    pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
