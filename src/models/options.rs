//! Run options data model and validation

use crate::error::{AppError, Result};
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for a single watch-and-push run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// The file whose modification triggers the push
    pub target_file_path: PathBuf,

    /// Watching stops after this many seconds even without a modification
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Pushgateway job the metrics are grouped under
    #[serde(default = "default_job_name")]
    pub job_name: String,

    /// Pushgateway address, `host:port` or a full URL
    pub pushgateway_host: String,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Diagnostic output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl RunOptions {
    /// Create options with defaults for everything but the two required settings
    pub fn new<P: Into<PathBuf>, S: Into<String>>(target_file_path: P, pushgateway_host: S) -> Self {
        Self {
            target_file_path: target_file_path.into(),
            timeout_seconds: default_timeout_secs(),
            job_name: default_job_name(),
            pushgateway_host: pushgateway_host.into(),
            verbose: false,
            debug: false,
            enable_color: default_enable_color(),
            log_format: LogFormat::default(),
        }
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Validate the options and return the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.target_file_path.as_os_str().is_empty() {
            return Err(AppError::config("TARGET_FILE_PATH cannot be empty"));
        }

        let metadata = std::fs::metadata(&self.target_file_path).map_err(|e| {
            AppError::config(format!(
                "Cannot watch '{}': {}",
                self.target_file_path.display(),
                e
            ))
        })?;

        if !metadata.is_file() {
            return Err(AppError::config(format!(
                "TARGET_FILE_PATH must point to a regular file: {}",
                self.target_file_path.display()
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::config("MAX_TIMEOUT must be greater than 0"));
        }

        if self.job_name.trim().is_empty() {
            return Err(AppError::config("JOB_NAME cannot be empty"));
        }

        if self.pushgateway_host.trim().is_empty() {
            return Err(AppError::config("PUSHGATEWAY_HOST cannot be empty"));
        }

        crate::pusher::push_url(&self.pushgateway_host, &self.job_name)?;

        Ok(())
    }
}

// Default value functions for serde
fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_job_name() -> String {
    crate::defaults::DEFAULT_JOB_NAME.to_string()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
