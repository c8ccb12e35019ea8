//! Watcher implementation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::batch::Batcher;
use crate::changeset::Changeset;
use crate::config::WatchConfig;
use crate::error::{Result, WatchError};
use crate::event::RawEvent;
use crate::exists::StatExistence;
use crate::filter::{BaseDirs, base_dirs, valid_patterns};
use crate::normalize::resolve_root;

/// Start watching with a fresh changeset channel sized by
/// [`WatchConfig::output_capacity`].
pub fn watch(config: WatchConfig) -> Result<(Watcher, mpsc::Receiver<Changeset>)> {
    let (tx, rx) = mpsc::channel(config.output_capacity.max(1));
    let watcher = Watcher::watch(config, tx)?;
    Ok((watcher, rx))
}

/// Handle to a running watch.
///
/// Changesets are sent on the channel handed to [`Watcher::watch`] in the
/// order their batches closed. Dropping the handle stops the watch.
pub struct Watcher {
    root: PathBuf,
    bases: Vec<PathBuf>,
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    cancel: CancellationToken,
}

struct State {
    stopped: bool,
    subscription: Option<RecommendedWatcher>,
    output: Option<mpsc::Sender<Changeset>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send one changeset unless the watch has been stopped.
    ///
    /// Returns false once nothing more can be sent.
    async fn publish(&self, changeset: Changeset) -> bool {
        let output = self.lock().output.clone();
        let Some(output) = output else {
            return false;
        };
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            permit = output.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => return false,
            },
        };

        let state = self.lock();
        if state.stopped {
            return false;
        }
        permit.send(changeset);
        true
    }
}

impl Watcher {
    /// Watch `config.root` and send every non-empty changeset on `output`.
    ///
    /// Malformed patterns are logged and ignored. Failing to subscribe to
    /// any base directory is an error and nothing is left running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch(config: WatchConfig, output: mpsc::Sender<Changeset>) -> Result<Self> {
        let root = resolve_root(&config.root)?;

        let includes = valid_patterns(&config.includes);
        let excludes = valid_patterns(&config.excludes);
        let BaseDirs { includes, bases } = base_dirs(&root, &includes)?;

        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let subscription = subscribe(&bases, event_tx)?;

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                stopped: false,
                subscription: Some(subscription),
                output: Some(output),
            }),
            cancel: CancellationToken::new(),
        });

        let task = BatchTask {
            batcher: Batcher::new(config.lull(), config.max_wait(), StatExistence),
            events: event_rx,
            root: root.clone(),
            includes,
            excludes,
            shared: Arc::clone(&shared),
        };
        let span = info_span!("watch", root = %root.display());
        tokio::spawn(task.run().instrument(span));

        info!(
            "Watching {} ({} base directories)",
            root.display(),
            bases.len()
        );
        Ok(Self {
            root,
            bases,
            shared,
        })
    }

    /// Root that reported paths are relative to, with symlinks resolved.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories with an OS subscription.
    pub fn bases(&self) -> &[PathBuf] {
        &self.bases
    }

    /// Check if [`Watcher::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.shared.lock().stopped
    }

    /// Stop watching.
    ///
    /// No changeset is sent after this returns and the output channel is
    /// closed, so a pending receive returns `None`. If the batch task is
    /// waiting for channel capacity at that moment, the channel closes as
    /// soon as the task sees the cancellation. Safe to call more than once
    /// and from any thread.
    pub fn stop(&self) {
        let (subscription, output) = {
            let mut state = self.shared.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            self.shared.cancel.cancel();
            (state.subscription.take(), state.output.take())
        };
        drop(subscription);
        drop(output);
        info!("Stopped watching {}", self.root.display());
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("root", &self.root)
            .field("bases", &self.bases)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Open one recursive subscription covering every base.
fn subscribe(bases: &[PathBuf], events: mpsc::Sender<RawEvent>) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(
        move |res: std::result::Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                for raw in RawEvent::from_notify(event) {
                    match events.try_send(raw) {
                        Ok(()) | Err(TrySendError::Closed(_)) => {}
                        Err(TrySendError::Full(raw)) => {
                            warn!("event queue full, dropping event for {}", raw.path.display());
                        }
                    }
                }
            }
            Err(e) => {
                error!("Watch error: {e}");
            }
        },
    )
    .map_err(|source| WatchError::Subscribe {
        path: bases.first().cloned().unwrap_or_default(),
        source,
    })?;

    for base in bases {
        watcher
            .watch(base, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Subscribe {
                path: base.clone(),
                source,
            })?;
        debug!("Started watching: {}", base.display());
    }
    Ok(watcher)
}

/// The background half of a watch: batches raw events and publishes the
/// results.
struct BatchTask {
    batcher: Batcher<StatExistence>,
    events: mpsc::Receiver<RawEvent>,
    root: PathBuf,
    includes: Vec<String>,
    excludes: Vec<String>,
    shared: Arc<Shared>,
}

impl BatchTask {
    async fn run(mut self) {
        let roots = [self.root.clone()];
        while let Some(batch) = self
            .batcher
            .next_batch(&mut self.events, &self.shared.cancel)
            .await
        {
            if batch.is_empty() {
                continue;
            }
            let normalized = match batch.normalize(&roots) {
                Ok(normalized) => normalized,
                Err(err) => {
                    warn!("could not normalize batch: {err}");
                    continue;
                }
            };
            let changeset = match normalized.filter(&self.includes, &self.excludes) {
                Ok(filtered) => filtered,
                Err(err) => {
                    warn!("publishing unfiltered batch: {err}");
                    normalized
                }
            };
            if changeset.is_empty() {
                continue;
            }
            debug!(
                added = changeset.added.len(),
                changed = changeset.changed.len(),
                deleted = changeset.deleted.len(),
                "publishing changeset"
            );
            if !self.shared.publish(changeset).await {
                break;
            }
        }
        debug!("batch task finished");
    }
}
