//! Data models and structures for the speedtest pusher

pub mod options;
pub mod result;

// Re-export main model types
pub use options::RunOptions;
pub use result::SpeedTestResult;
