//! File change notifications for a single target path

pub mod notify_source;

pub use notify_source::NotifySource;

use crate::error::{AppError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// What kind of change a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// A regular file's contents changed
    ContentModified,
    /// Permissions, timestamps or other metadata changed
    MetadataModified,
    /// A directory changed
    DirectoryModified,
    /// Creation, removal, rename, access and anything else
    Other,
}

/// A single change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
}

impl FileEvent {
    pub fn new<P: Into<PathBuf>>(kind: FileEventKind, path: P) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Shorthand for a content modification of `path`
    pub fn modified<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(FileEventKind::ContentModified, path)
    }

    /// Whether this is a content modification of exactly `target`
    pub fn is_content_change_of(&self, target: &Path) -> bool {
        self.kind == FileEventKind::ContentModified && self.path == target
    }
}

/// Items delivered on a subscription's channel
pub type EventResult = std::result::Result<FileEvent, AppError>;

/// Releases a subscription. Cancelling twice is a no-op, and dropping an
/// uncancelled handle cancels it.
pub struct SubscriptionHandle {
    release: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl SubscriptionHandle {
    /// Wrap the action that stops delivery for the subscription
    pub fn new<F: FnOnce() + Send + 'static>(release: F) -> Self {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// Stop delivering events
    pub fn cancel(&mut self) {
        let release = match self.release.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(release) = release {
            release();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self.release.lock() {
            Ok(slot) => slot.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// An active watch: the event stream plus the handle that ends it
#[derive(Debug)]
pub struct Subscription {
    pub events: mpsc::UnboundedReceiver<EventResult>,
    pub handle: SubscriptionHandle,
}

/// Capability to watch one path for changes
pub trait EventSource {
    /// Start delivering change notifications for `target`
    fn subscribe(&mut self, target: &Path) -> Result<Subscription>;
}
