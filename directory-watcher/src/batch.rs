//! Event batching.
//!
//! Raw notifications are unreliable: rename events do not say whether a path
//! is the source or the destination, events can arrive out of order, editors
//! save through short-lived temporary files, and some platforms report a
//! create alongside the remove of a pre-existing file. The batcher collects
//! events until the stream goes quiet, then resolves the accumulated sets
//! against the current state of the filesystem.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::changeset::Changeset;
use crate::event::{RawEvent, RawEventKind};
use crate::exists::ExistenceCheck;

/// Longest a cycle may run when events never let up.
pub const MAX_LULL_WAIT: Duration = Duration::from_secs(8);

/// Where a batching cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Events are still arriving.
    Collecting,

    /// No event arrived for a full lull.
    LullElapsed,

    /// The cycle hit its maximum duration and was flushed.
    MaxTimeElapsed,
}

/// Paths seen during one cycle, grouped by event kind.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    added: HashSet<PathBuf>,
    removed: HashSet<PathBuf>,
    changed: HashSet<PathBuf>,
    renamed: HashSet<PathBuf>,
}

impl Accumulator {
    /// Record one event.
    pub fn record(&mut self, event: RawEvent) {
        let set = match event.kind {
            RawEventKind::Create => &mut self.added,
            RawEventKind::Remove => &mut self.removed,
            RawEventKind::Write => &mut self.changed,
            RawEventKind::Rename => &mut self.renamed,
        };
        set.insert(event.path);
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.renamed.is_empty()
    }

    /// Resolve the recorded events into a changeset.
    ///
    /// The result depends only on the recorded sets and the answers of
    /// `exists`, never on the order events arrived in. Steps run in a fixed
    /// order because each one works on what the previous one left behind:
    ///
    /// 1. A renamed path that exists was the destination and counts as
    ///    added; otherwise it was the source and counts as removed.
    /// 2. An added path that exists is reported as added only. One that does
    ///    not exist was transient and is dropped from every set.
    /// 3. A removed path that exists again is not reported as removed. One
    ///    that is gone is reported as removed only.
    pub fn reconcile<C: ExistenceCheck + ?Sized>(&self, exists: &C) -> Changeset {
        let mut added = self.added.clone();
        let mut removed = self.removed.clone();
        let mut changed = self.changed.clone();

        for path in &self.renamed {
            if exists.check(path) {
                added.insert(path.clone());
            } else {
                removed.insert(path.clone());
            }
        }

        added.retain(|path| {
            changed.remove(path);
            removed.remove(path);
            exists.check(path)
        });

        removed.retain(|path| {
            if exists.check(path) {
                return false;
            }
            added.remove(path);
            changed.remove(path);
            true
        });

        Changeset {
            added: sorted(&added),
            changed: sorted(&changed),
            deleted: sorted(&removed),
        }
    }
}

fn sorted(paths: &HashSet<PathBuf>) -> Vec<String> {
    paths
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Turns a stream of raw events into one changeset per quiet period.
#[derive(Debug, Clone)]
pub struct Batcher<C> {
    lull: Duration,
    max_wait: Duration,
    exists: C,
}

impl<C: ExistenceCheck> Batcher<C> {
    /// Create a batcher that closes a cycle after `lull` without events, or
    /// after `max_wait` regardless.
    pub fn new(lull: Duration, max_wait: Duration, exists: C) -> Self {
        Self {
            lull,
            max_wait,
            exists,
        }
    }

    /// Run one batching cycle.
    ///
    /// Waits for the first event, then collects until either the lull or
    /// the maximum wait elapses. Returns `None` once the event channel is
    /// closed or `cancel` fires; a partially collected cycle is discarded.
    pub async fn next_batch(
        &self,
        events: &mut mpsc::Receiver<RawEvent>,
        cancel: &CancellationToken,
    ) -> Option<Changeset> {
        let first = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            event = events.recv() => event?,
        };

        let started = Instant::now();
        let max_deadline = started + self.max_wait;
        let mut lull_deadline = started + self.lull;
        let mut pending = Accumulator::default();
        pending.record(first);
        let mut state = CycleState::Collecting;
        let mut received = 1usize;

        while state == CycleState::Collecting {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = sleep_until(max_deadline) => state = CycleState::MaxTimeElapsed,
                event = events.recv() => {
                    pending.record(event?);
                    received += 1;
                    lull_deadline = Instant::now() + self.lull;
                }
                _ = sleep_until(lull_deadline) => state = CycleState::LullElapsed,
            }
        }

        let changeset = pending.reconcile(&self.exists);
        trace!(
            ?state,
            received,
            elapsed = ?started.elapsed(),
            "batch cycle closed"
        );
        Some(changeset)
    }
}
