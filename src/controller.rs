//! Turns the first modification of the target file into exactly one push

use crate::{
    error::Result,
    logging::Logger,
    metrics::MetricSet,
    models::RunOptions,
    parser::ResultParser,
    pusher::Delivery,
    watcher::{FileEvent, SubscriptionHandle},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Receives change notifications from a subscription
#[async_trait]
pub trait FileChangeHandler: Send {
    /// Handle one notification. An error ends the run.
    async fn on_file_change(&mut self, event: FileEvent) -> Result<()>;

    /// Whether the handler wants no further events
    fn is_done(&self) -> bool;
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Watching,
    Done,
}

/// Waits for the target file to be rewritten, then reads, records and
/// pushes the result and releases the subscription.
pub struct WatchController<D: Delivery> {
    target: PathBuf,
    job_name: String,
    pushgateway_host: String,
    metrics: MetricSet,
    delivery: D,
    subscription: SubscriptionHandle,
    state: WatchState,
    logger: Logger,
}

impl<D: Delivery> WatchController<D> {
    pub fn new(
        options: &RunOptions,
        metrics: MetricSet,
        delivery: D,
        subscription: SubscriptionHandle,
        logger: Logger,
    ) -> Self {
        Self {
            target: options.target_file_path.clone(),
            job_name: options.job_name.clone(),
            pushgateway_host: options.pushgateway_host.clone(),
            metrics,
            delivery,
            subscription,
            state: WatchState::Watching,
            logger,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    /// Read -> parse -> record -> deliver for the triggering path
    async fn push_result(&self, path: &Path) -> Result<()> {
        self.logger.info("Importing the raw result").field("path", path.display().to_string()).log().await;
        let raw = tokio::fs::read(path).await?;
        let json: serde_json::Value = serde_json::from_slice(&raw)?;

        let result = ResultParser::parse(&json)?;
        self.logger.info("Parsed speedtest result")
            .field("id", &result.test_id)
            .field("sponsor", &result.sponsor)
            .field("download", result.download_bytes_per_sec)
            .field("upload", result.upload_bytes_per_sec)
            .field("ping", result.ping_milliseconds)
            .log()
            .await;

        self.metrics.record(&result);
        self.logger.info("Recorded metrics").log().await;

        self.logger.info("Pushing metrics")
            .field("job", &self.job_name)
            .field("gateway", &self.pushgateway_host)
            .log()
            .await;
        self.delivery
            .deliver(&self.job_name, &self.pushgateway_host, self.metrics.registry())
            .await?;
        self.logger.info("Pushed metrics").log().await;

        Ok(())
    }
}

#[async_trait]
impl<D: Delivery> FileChangeHandler for WatchController<D> {
    async fn on_file_change(&mut self, event: FileEvent) -> Result<()> {
        if self.state == WatchState::Done {
            return Ok(());
        }

        if !event.is_content_change_of(&self.target) {
            self.logger.debug("Ignoring change")
                .field("path", event.path.display().to_string())
                .field("kind", format!("{:?}", event.kind))
                .log()
                .await;
            return Ok(());
        }

        self.logger.info("Target file modified").field("path", event.path.display().to_string()).log().await;

        // Flip before any I/O so a second qualifying event can never push again
        self.state = WatchState::Done;
        let outcome = self.push_result(&event.path).await;
        self.subscription.cancel();

        if let Err(error) = &outcome {
            self.logger.error("Handling the modification failed").error_info(error).log().await;
        }
        outcome
    }

    fn is_done(&self) -> bool {
        self.state == WatchState::Done
    }
}
