//! Raw filesystem events as delivered by the OS subscription.

use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind};
use serde::{Deserialize, Serialize};

/// A single raw filesystem notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// The kind of event.
    pub kind: RawEventKind,

    /// Absolute path of the affected file or directory.
    pub path: PathBuf,
}

impl RawEvent {
    /// Create a new raw event.
    pub fn new(kind: RawEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Split a `notify` event into one raw event per affected path.
    ///
    /// Access and metadata-only notifications are dropped.
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        let Some(kind) = RawEventKind::from_notify(event.kind) else {
            return Vec::new();
        };
        event
            .paths
            .into_iter()
            .map(|path| Self::new(kind, path))
            .collect()
    }
}

/// Kind of raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawEventKind {
    /// A path was created.
    Create,

    /// A path was removed.
    Remove,

    /// File contents were written.
    Write,

    /// A path was renamed. Whether it is the source or the destination is
    /// not known until the path is checked for existence.
    Rename,
}

impl RawEventKind {
    /// Map a `notify` event kind, or `None` if the kind is not tracked.
    pub fn from_notify(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Remove(_) => Some(Self::Remove),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Write),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }
}
