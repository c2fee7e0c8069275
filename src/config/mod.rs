//! Configuration management module

pub mod env;
pub mod parser;

// Re-export main functionality
pub use env::EnvManager;
pub use parser::{display_options_summary, load_options, OptionsParser};

// Re-export from models for convenience
pub use crate::models::RunOptions;
