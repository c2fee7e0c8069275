//! [`EventSource`] backed by the platform watcher from the `notify` crate

use super::{EventSource, FileEvent, FileEventKind, Subscription, SubscriptionHandle};
use crate::error::Result;
use notify::{
    event::ModifyKind, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::Path;
use tokio::sync::mpsc;

/// Watches a single path with the OS notification backend.
///
/// The backend calls back on its own thread; events are converted there and
/// forwarded over an unbounded channel, so the callback never blocks.
#[derive(Debug, Default)]
pub struct NotifySource;

impl NotifySource {
    pub fn new() -> Self {
        Self
    }
}

impl EventSource for NotifySource {
    fn subscribe(&mut self, target: &Path) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for file_event in convert(&event) {
                        // Receiver gone means the run is over
                        let _ = tx.send(Ok(file_event));
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e.into()));
                }
            })?;

        watcher.watch(target, RecursiveMode::NonRecursive)?;

        let path = target.to_path_buf();
        let handle = SubscriptionHandle::new(move || {
            let mut watcher = watcher;
            let _ = watcher.unwatch(&path);
        });

        Ok(Subscription { events: rx, handle })
    }
}

/// Split a backend event into one [`FileEvent`] per affected path
pub fn convert(event: &Event) -> Vec<FileEvent> {
    event
        .paths
        .iter()
        .map(|path| FileEvent::new(classify(&event.kind, path), path.clone()))
        .collect()
}

/// Map a backend event kind onto [`FileEventKind`]
pub fn classify(kind: &EventKind, path: &Path) -> FileEventKind {
    if path.is_dir() {
        return match kind {
            EventKind::Modify(_) => FileEventKind::DirectoryModified,
            _ => FileEventKind::Other,
        };
    }

    match kind {
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            FileEventKind::ContentModified
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => FileEventKind::MetadataModified,
        _ => FileEventKind::Other,
    }
}
