//! Error handling for the speedtest pusher

use thiserror::Error;

/// Custom error types for the speedtest pusher
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid settings, detected before watching starts
    #[error("Configuration error: {0}")]
    Config(String),

    /// Result file could not be read or decoded when the change fired
    #[error("I/O error: {0}")]
    Io(String),

    /// Required result field missing or not numeric
    #[error("Malformed speedtest result: {0}")]
    MalformedResult(String),

    /// Gauge definition rejected by the registry
    #[error("Metric registration error: {0}")]
    Registration(String),

    /// Pushgateway could not be reached or refused the push
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// File notification backend failures
    #[error("Watch error: {0}")]
    Watch(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new malformed result error
    pub fn malformed_result<S: Into<String>>(message: S) -> Self {
        Self::MalformedResult(message.into())
    }

    /// Create a new registration error
    pub fn registration<S: Into<String>>(message: S) -> Self {
        Self::Registration(message.into())
    }

    /// Create a new delivery error
    pub fn delivery<S: Into<String>>(message: S) -> Self {
        Self::Delivery(message.into())
    }

    /// Create a new watch error
    pub fn watch<S: Into<String>>(message: S) -> Self {
        Self::Watch(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Io(_) => "IO",
            Self::MalformedResult(_) => "MALFORMED",
            Self::Registration(_) => "REGISTRATION",
            Self::Delivery(_) => "DELIVERY",
            Self::Watch(_) => "WATCH",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Set TARGET_FILE_PATH and PUSHGATEWAY_HOST in the environment or your .env file.", msg)
            }
            Self::Io(msg) => {
                format!("Could not read the speedtest result: {}\n\nSuggestion: Make sure the producer writes complete JSON and the file stays in place until it is read.", msg)
            }
            Self::MalformedResult(msg) => {
                format!("The speedtest result is incomplete: {}\n\nSuggestion: Generate the file with `speedtest --json` so the server, client, download, upload and ping fields are present.", msg)
            }
            Self::Registration(msg) => {
                format!("Metric registration failed: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
            Self::Delivery(msg) => {
                format!("Pushing metrics failed: {}\n\nSuggestion: Check that the Pushgateway at PUSHGATEWAY_HOST is running and reachable.", msg)
            }
            Self::Watch(msg) => {
                format!("Watching the result file failed: {}\n\nSuggestion: Check that the target file exists and the system file watch limit is not exhausted.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,
            Self::Delivery(_) => 2,
            Self::Watch(_) => 3,
            Self::Io(_) => 5,
            Self::MalformedResult(_) => 6,
            Self::Registration(_) => 7,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::MalformedResult(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Delivery(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Watch(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Registration(_) | Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

// JSON only shows up when decoding the result file, so a bad document is an I/O failure
impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::io(format!("JSON decode error: {}", error))
    }
}

impl From<prometheus::Error> for AppError {
    fn from(error: prometheus::Error) -> Self {
        Self::registration(error.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::delivery(format!("request timed out: {}", error))
        } else if error.is_connect() {
            Self::delivery(format!("connection failed: {}", error))
        } else {
            Self::delivery(error.to_string())
        }
    }
}

impl From<notify::Error> for AppError {
    fn from(error: notify::Error) -> Self {
        Self::watch(error.to_string())
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

// Rejected arguments are configuration problems, whatever clap's own exit code
impl From<clap::Error> for AppError {
    fn from(error: clap::Error) -> Self {
        let rendered = error.to_string();
        let message = rendered.trim_start_matches("error: ").trim_end();
        Self::config(message)
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;
