//! Configuration types for directory watching.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::MAX_LULL_WAIT;

/// Default quiet period that closes a batch.
pub const DEFAULT_LULL: Duration = Duration::from_millis(200);

/// Default capacity of the raw event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Configuration for one watched root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory that paths are reported relative to.
    pub root: PathBuf,

    /// Include patterns (glob patterns, relative to the root).
    pub includes: Vec<String>,

    /// Exclude patterns (glob patterns, relative to the root).
    pub excludes: Vec<String>,

    /// Quiet period in milliseconds that closes a batch.
    pub lull_ms: u64,

    /// Maximum batch duration in milliseconds.
    pub max_wait_ms: u64,

    /// Capacity of the raw event channel.
    pub event_capacity: usize,

    /// Capacity of the changeset channel created by [`crate::watch`].
    pub output_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

impl WatchConfig {
    /// Create a config that watches everything under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            includes: vec!["**".to_string()],
            excludes: Vec::new(),
            lull_ms: duration_ms(DEFAULT_LULL),
            max_wait_ms: duration_ms(MAX_LULL_WAIT),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            output_capacity: 1,
        }
    }

    /// Replace the include patterns.
    pub fn with_includes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    /// Set the lull.
    pub fn with_lull(mut self, lull: Duration) -> Self {
        self.lull_ms = duration_ms(lull);
        self
    }

    /// Set the maximum batch duration.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait_ms = duration_ms(max_wait);
        self
    }

    /// Quiet period that closes a batch.
    pub fn lull(&self) -> Duration {
        Duration::from_millis(self.lull_ms)
    }

    /// Maximum batch duration.
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
