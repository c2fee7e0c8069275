//! Command-line interface
//!
//! Every setting can come from a flag or from the environment variable named
//! in its `env` attribute; flags win.

use crate::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;

/// Speedtest Pusher - pushes one speedtest result to a Prometheus Pushgateway
#[derive(Parser, Debug, Clone)]
#[command(name = "pusher")]
#[command(version, about, long_about = None)]
#[command(after_help = crate::config::EnvManager::display_env_help())]
pub struct Cli {
    /// Result file to watch (written by `speedtest --json`)
    #[arg(long = "target-file", env = "TARGET_FILE_PATH", value_name = "PATH")]
    pub target_file: Option<PathBuf>,

    /// Stop watching after this many seconds
    #[arg(short, long, env = "MAX_TIMEOUT", value_name = "SECONDS", value_parser = parse_timeout, default_value_t = crate::defaults::DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Pushgateway job name
    #[arg(long, env = "JOB_NAME", default_value = crate::defaults::DEFAULT_JOB_NAME)]
    pub job_name: String,

    /// Pushgateway address, e.g. `localhost:9091`
    #[arg(long, env = "PUSHGATEWAY_HOST", value_name = "HOST")]
    pub pushgateway_host: Option<String>,

    /// Diagnostic output format (console, json, compact)
    #[arg(long, env = "LOG_FORMAT", default_value = "console", value_parser = parse_log_format)]
    pub log_format: LogFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }
}

/// Parse a positive number of seconds
fn parse_timeout(s: &str) -> Result<u64, String> {
    // Reject strings with leading + sign or other invalid formats
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid timeout: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid timeout: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Timeout must be greater than 0".to_string())
            } else {
                Ok(secs)
            }
        })
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse::<LogFormat>().map_err(|e| e.to_string())
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    // Default to true on Unix-like systems, false on Windows
    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
