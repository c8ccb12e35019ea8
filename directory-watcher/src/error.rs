//! Error types for the directory watcher.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// A malformed glob pattern.
///
/// Pattern errors are reported per pattern and never abort a watcher; see
/// [`crate::filter`] for how callers are expected to treat them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("bad pattern {pattern:?}: {reason}")]
pub struct PatternError {
    /// The pattern as supplied by the user.
    pub pattern: String,

    /// What is wrong with it.
    pub reason: &'static str,
}

impl PatternError {
    pub(crate) fn new(pattern: &str, reason: &'static str) -> Self {
        Self {
            pattern: pattern.to_string(),
            reason,
        }
    }
}

/// Errors that can occur in the directory watcher.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The watch root does not exist or is not a directory.
    #[error("watch root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// An OS-level subscription could not be opened.
    #[error("could not watch path '{}': {source}", path.display())]
    Subscribe {
        /// Base directory we tried to subscribe to.
        path: PathBuf,
        /// Underlying notify failure.
        #[source]
        source: notify::Error,
    },

    /// Invalid glob pattern.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Directory walk error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
