//! Speedtest Pusher - Main CLI Application
//!
//! Watches a speedtest result file and pushes the result to a Prometheus
//! Pushgateway the first time the file is rewritten.

use clap::Parser;
use speedtest_pusher::{
    app::{RunLoop, RunOutcome},
    cli::Cli,
    config::{display_options_summary, load_options, EnvManager},
    error::{AppError, Result},
    logging::Logger,
    pusher::PushGatewayClient,
    watcher::NotifySource,
    PKG_NAME, VERSION,
};
use std::process;

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue at: https://github.com/MaurUppi/speedtest-pusher/issues");
        process::exit(99);
    }));

    // .env values must be in the environment before clap reads it
    let env_loaded = EnvManager::load_env_file();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => exit_with_error(&AppError::from(e), false),
    };
    let use_color = cli.use_colors();

    let result = match env_loaded {
        Ok(loaded) => run_application(cli, loaded).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        exit_with_error(&e, use_color);
    }
}

/// Print the error with its suggestion and exit with its category's code
fn exit_with_error(error: &AppError, use_color: bool) -> ! {
    eprintln!("{}", error.format_for_console(use_color));
    eprintln!();
    eprintln!("{}", error.user_friendly_message());
    process::exit(error.exit_code());
}

/// Main application logic
async fn run_application(cli: Cli, env_file_loaded: bool) -> Result<()> {
    for warning in EnvManager::validate_current_env() {
        eprintln!("{}", warning);
    }

    let options = load_options(cli)?;

    let logger = Logger::with_options("PUSHER", &options);
    let session_id = logger.start_session().await;

    logger.info("Pusher started")
        .field("name", PKG_NAME)
        .field("version", VERSION)
        .field("session_id", &session_id)
        .log()
        .await;
    logger.debug("Loaded options")
        .field("env_file", env_file_loaded)
        .field("summary", display_options_summary(&options))
        .log()
        .await;

    let delivery = PushGatewayClient::new(logger.named("PUSH"))?;
    let outcome = RunLoop::new(options, NotifySource::new(), delivery, logger.clone())
        .run()
        .await?;

    match outcome {
        RunOutcome::Pushed => logger.info("Finished after pushing the result").log().await,
        RunOutcome::TimedOut => logger.info("Finished without a push").log().await,
    }

    Ok(())
}
