//! Run options parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    error::{AppError, Result},
    models::RunOptions,
};

/// Builds [`RunOptions`] from parsed CLI arguments.
///
/// Environment variables and `.env` values already reach the CLI through
/// clap's `env` attributes, so this only checks required settings and
/// validates the result.
pub struct OptionsParser {
    cli: Cli,
}

impl OptionsParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and validate the complete options
    pub fn parse(&self) -> Result<RunOptions> {
        let target = self
            .cli
            .target_file
            .clone()
            .ok_or_else(|| AppError::config("TARGET_FILE_PATH must be set (or pass --target-file)"))?;
        let host = self
            .cli
            .pushgateway_host
            .clone()
            .ok_or_else(|| AppError::config("PUSHGATEWAY_HOST must be set (or pass --pushgateway-host)"))?;

        let mut options = RunOptions::new(target, host);
        self.apply_cli_settings(&mut options);
        options.validate()?;

        // Notifications carry absolute paths
        options.target_file_path = options.target_file_path.canonicalize().map_err(|e| {
            AppError::config(format!(
                "Cannot resolve '{}': {}",
                options.target_file_path.display(),
                e
            ))
        })?;

        Ok(options)
    }

    fn apply_cli_settings(&self, options: &mut RunOptions) {
        options.timeout_seconds = self.cli.timeout;
        options.job_name = self.cli.job_name.clone();
        options.verbose = self.cli.verbose;
        options.debug = self.cli.debug;
        options.enable_color = self.cli.use_colors();
        options.log_format = self.cli.log_format;
    }
}

/// Convenience function to load validated options from CLI arguments
pub fn load_options(cli: Cli) -> Result<RunOptions> {
    OptionsParser::new(cli).parse()
}

/// Display options summary for debug purposes
pub fn display_options_summary(options: &RunOptions) -> String {
    let summary = [
        format!("Target file: {}", options.target_file_path.display()),
        format!("Pushgateway: {}", options.pushgateway_host),
        format!("Job name: {}", options.job_name),
        format!("Timeout: {}s", options.timeout_seconds),
        format!("Color Output: {}", options.enable_color),
        format!("Verbose: {}", options.verbose),
        format!("Debug: {}", options.debug),
    ];

    summary.join("\n")
}
