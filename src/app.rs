//! Run loop: watch, wait for one modification or the timeout, then stop

use crate::{
    controller::{FileChangeHandler, WatchController},
    error::{AppError, Result},
    logging::Logger,
    metrics::MetricSet,
    models::RunOptions,
    pusher::Delivery,
    watcher::{EventResult, EventSource, Subscription},
};
use prometheus::Registry;
use std::time::Duration;
use tokio::{sync::mpsc::UnboundedReceiver, time::Instant};

/// How a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The target file changed and its result was pushed
    Pushed,
    /// The timeout elapsed before any qualifying change; nothing was pushed
    TimedOut,
}

/// Hosts a [`WatchController`] for at most `options.timeout()`
pub struct RunLoop<S: EventSource, D: Delivery> {
    options: RunOptions,
    source: S,
    delivery: D,
    logger: Logger,
}

impl<S: EventSource, D: Delivery> RunLoop<S, D> {
    pub fn new(options: RunOptions, source: S, delivery: D, logger: Logger) -> Self {
        Self {
            options,
            source,
            delivery,
            logger,
        }
    }

    /// Watch the target file and push its result at most once
    pub async fn run(self) -> Result<RunOutcome> {
        let Self {
            options,
            mut source,
            delivery,
            logger,
        } = self;

        // Registration problems abort before anything is watched
        let metrics = MetricSet::new(Registry::new())?;

        let Subscription { events, handle } = source.subscribe(&options.target_file_path)?;
        logger.info("Watching target file")
            .field("path", options.target_file_path.display().to_string())
            .field("timeout_secs", options.timeout_seconds)
            .log()
            .await;

        let mut controller = WatchController::new(
            &options,
            metrics,
            delivery,
            handle,
            logger.named("WATCH"),
        );

        wait_for_change(&mut controller, events, options.timeout(), &logger).await
    }
}

/// Feed events to `handler` until it is done or `timeout` passes.
///
/// The deadline only bounds idle waiting: once an event is handed over the
/// handler runs to completion even if the deadline passes meanwhile.
pub async fn wait_for_change<H: FileChangeHandler>(
    handler: &mut H,
    mut events: UnboundedReceiver<EventResult>,
    timeout: Duration,
    logger: &Logger,
) -> Result<RunOutcome> {
    // A timeout too large for the clock means no deadline at all
    let deadline = Instant::now().checked_add(timeout);

    loop {
        let next = tokio::select! {
            next = events.recv() => next,
            _ = expire(deadline) => {
                logger.info("No modification observed before the timeout")
                    .field("timeout_secs", timeout.as_secs())
                    .log()
                    .await;
                return Ok(RunOutcome::TimedOut);
            }
        };

        match next {
            Some(Ok(event)) => {
                logger.trace("Received change notification")
                    .field("path", event.path.display().to_string())
                    .log()
                    .await;
                handler.on_file_change(event).await?;
                if handler.is_done() {
                    return Ok(RunOutcome::Pushed);
                }
            }
            Some(Err(error)) => {
                logger.warn("File watcher reported an error").error_info(&error).log().await;
            }
            None => {
                return Err(AppError::watch(
                    "notification stream ended before the target file changed",
                ));
            }
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::{FileEvent, FileEventKind, SubscriptionHandle};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;
    use tokio::sync::mpsc::{self, UnboundedSender};

    const VALID: &str = r#"{"server":{"id":"1234","sponsor":"ACME"},"client":{"ip":"1.2.3.4","country":"US"},"download":123456789.0,"upload":987654.0,"ping":12.3}"#;

    /// Event source driven by the test through a channel
    struct ScriptedSource {
        sender: Arc<Mutex<Option<UnboundedSender<EventResult>>>>,
        subscribed: Arc<Mutex<Vec<PathBuf>>>,
        cancels: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                sender: Arc::new(Mutex::new(None)),
                subscribed: Arc::new(Mutex::new(Vec::new())),
                cancels: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn handle(&self) -> (Arc<Mutex<Option<UnboundedSender<EventResult>>>>, Arc<AtomicUsize>) {
            (self.sender.clone(), self.cancels.clone())
        }
    }

    impl EventSource for ScriptedSource {
        fn subscribe(&mut self, target: &Path) -> Result<Subscription> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.sender.lock().unwrap() = Some(tx);
            self.subscribed.lock().unwrap().push(target.to_path_buf());

            let cancels = self.cancels.clone();
            let handle = SubscriptionHandle::new(move || {
                cancels.fetch_add(1, Ordering::SeqCst);
            });
            Ok(Subscription { events: rx, handle })
        }
    }

    #[derive(Clone, Default)]
    struct CountingDelivery {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Delivery for CountingDelivery {
        async fn deliver(&self, _job: &str, _host: &str, _registry: &Registry) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn options(file: &NamedTempFile, timeout_seconds: u64) -> RunOptions {
        let mut options = RunOptions::new(file.path(), "pgw:9091");
        options.timeout_seconds = timeout_seconds;
        options
    }

    fn send(sender: &Arc<Mutex<Option<UnboundedSender<EventResult>>>>, event: EventResult) {
        sender.lock().unwrap().as_ref().unwrap().send(event).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_events() {
        let file = NamedTempFile::new().unwrap();
        let source = ScriptedSource::new();
        let (_sender, cancels) = source.handle();
        let delivery = CountingDelivery::default();
        let (logger, logs) = Logger::buffered("RUN");

        let outcome = RunLoop::new(options(&file, 1), source, delivery.clone(), logger)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::TimedOut);
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 0);
        // Handle dropped with the controller
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(logs.contains("Watching target file"));
        assert!(logs.contains("No modification observed"));
    }

    #[tokio::test]
    async fn test_pushes_on_first_qualifying_event() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), VALID).unwrap();
        let target = file.path().to_path_buf();

        let source = ScriptedSource::new();
        let subscribed = source.subscribed.clone();
        let (sender, cancels) = source.handle();
        let delivery = CountingDelivery::default();
        let (logger, _logs) = Logger::buffered("RUN");

        let run = tokio::spawn(RunLoop::new(options(&file, 30), source, delivery.clone(), logger).run());

        // Wait until the run has subscribed
        while sender.lock().unwrap().is_none() {
            tokio::task::yield_now().await;
        }
        send(&sender, Ok(FileEvent::modified(target.with_extension("tmp"))));
        send(&sender, Ok(FileEvent::new(FileEventKind::DirectoryModified, &target)));
        send(&sender, Err(AppError::watch("queue overflow")));
        send(&sender, Ok(FileEvent::modified(&target)));
        send(&sender, Ok(FileEvent::modified(&target)));

        let outcome = run.await.unwrap().unwrap();

        assert_eq!(outcome, RunOutcome::Pushed);
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert_eq!(subscribed.lock().unwrap().as_slice(), &[target]);
    }

    #[tokio::test]
    async fn test_handler_error_ends_run() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"server":{}}"#).unwrap();
        let target = file.path().to_path_buf();

        let source = ScriptedSource::new();
        let (sender, _cancels) = source.handle();
        let delivery = CountingDelivery::default();
        let (logger, _logs) = Logger::buffered("RUN");

        let run = tokio::spawn(RunLoop::new(options(&file, 30), source, delivery.clone(), logger).run());
        while sender.lock().unwrap().is_none() {
            tokio::task::yield_now().await;
        }
        send(&sender, Ok(FileEvent::modified(&target)));

        let error = run.await.unwrap().unwrap_err();
        assert!(matches!(error, AppError::MalformedResult(_)));
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_closed_stream_is_watch_error() {
        let (tx, rx) = mpsc::unbounded_channel::<EventResult>();
        drop(tx);

        let mut handler = StubHandler::default();
        let (logger, _logs) = Logger::buffered("RUN");

        let error = wait_for_change(&mut handler, rx, Duration::from_secs(30), &logger)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Watch(_)));
    }

    /// Handler that takes a while; the deadline must not cut it short
    #[derive(Default)]
    struct StubHandler {
        handled: usize,
        delay: Duration,
    }

    #[async_trait]
    impl FileChangeHandler for StubHandler {
        async fn on_file_change(&mut self, _event: FileEvent) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.handled += 1;
            Ok(())
        }

        fn is_done(&self) -> bool {
            self.handled > 0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_preempt_handler() {
        let (tx, rx) = mpsc::unbounded_channel::<EventResult>();
        tx.send(Ok(FileEvent::modified("/data/result.json"))).unwrap();

        let mut handler = StubHandler {
            handled: 0,
            delay: Duration::from_secs(5),
        };
        let (logger, _logs) = Logger::buffered("RUN");

        let outcome = wait_for_change(&mut handler, rx, Duration::from_secs(1), &logger)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Pushed);
        assert_eq!(handler.handled, 1);
    }

    #[tokio::test]
    async fn test_oversized_timeout_waits_without_deadline() {
        let (tx, rx) = mpsc::unbounded_channel::<EventResult>();
        tx.send(Ok(FileEvent::modified("/data/result.json"))).unwrap();

        let mut handler = StubHandler::default();
        let (logger, _logs) = Logger::buffered("RUN");

        let outcome = wait_for_change(&mut handler, rx, Duration::from_secs(u64::MAX), &logger)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Pushed);
        assert_eq!(handler.handled, 1);
    }

    #[tokio::test]
    async fn test_oversized_timeout_from_cli_does_not_panic() {
        use clap::Parser;

        let cli = crate::cli::Cli::try_parse_from(["pusher", "--timeout", "18446744073709551615"]).unwrap();
        let (tx, rx) = mpsc::unbounded_channel::<EventResult>();
        drop(tx);

        let mut handler = StubHandler::default();
        let (logger, _logs) = Logger::buffered("RUN");

        let error = wait_for_change(&mut handler, rx, Duration::from_secs(cli.timeout), &logger)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Watch(_)));
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_returned() {
        struct FailingSource;
        impl EventSource for FailingSource {
            fn subscribe(&mut self, target: &Path) -> Result<Subscription> {
                Err(AppError::watch(format!("cannot watch {}", target.display())))
            }
        }

        let file = NamedTempFile::new().unwrap();
        let (logger, _logs) = Logger::buffered("RUN");

        let error = RunLoop::new(options(&file, 1), FailingSource, CountingDelivery::default(), logger)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Watch(_)));
    }
}
