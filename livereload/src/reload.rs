//! Live reload signalling.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use devd_directory_watcher::{Changeset, WatchConfig, Watcher, watch};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{Instrument, debug, info_span};

use crate::error::Result;
use crate::route::RouteCollection;

const BROADCAST_CAPACITY: usize = 50;

/// What connected clients should reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadKind {
    /// Reload the whole page.
    Page,

    /// Only stylesheets changed; they can be swapped in place.
    Css,
}

impl ReloadKind {
    /// Classify a batch of changed paths. Returns `None` for an empty batch.
    pub fn classify<S: AsRef<str>>(paths: &[S]) -> Option<Self> {
        if paths.is_empty() {
            return None;
        }
        if paths.iter().all(|path| path.as_ref().ends_with(".css")) {
            Some(Self::Css)
        } else {
            Some(Self::Page)
        }
    }

    /// The command string sent to clients.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Css => "css",
        }
    }
}

impl fmt::Display for ReloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can be told which paths changed.
pub trait Reloader: Send + Sync {
    /// Signal that `paths` changed.
    fn reload(&self, paths: &[String]);
}

/// Broadcasts reload signals to every subscriber.
#[derive(Debug, Clone)]
pub struct LiveReload {
    name: String,
    tx: broadcast::Sender<ReloadKind>,
}

impl LiveReload {
    /// Create a broadcaster with no subscribers.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            name: name.into(),
            tx,
        }
    }

    /// Register a new client.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadKind> {
        self.tx.subscribe()
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Classify `paths` and broadcast the result.
    pub fn signal(&self, paths: &[String]) -> Option<ReloadKind> {
        let kind = ReloadKind::classify(paths)?;
        debug!(name = %self.name, "livereload {kind}, files changed: {paths:?}");
        // No subscribers is not an error.
        let _ = self.tx.send(kind);
        Some(kind)
    }

    /// Reload for every changeset on `changes` until the channel closes.
    pub async fn watch(&self, mut changes: mpsc::Receiver<Changeset>) {
        while let Some(changeset) = changes.recv().await {
            let paths = changeset.all();
            if !paths.is_empty() {
                self.signal(&paths);
            }
        }
    }
}

impl Reloader for LiveReload {
    fn reload(&self, paths: &[String]) {
        self.signal(paths);
    }
}

/// Watch every filesystem route and pass its changes to `reloader`.
///
/// Paths handed to the reloader are URL paths: each change is placed under
/// the path of the route it belongs to. Forwarding routes are skipped. The
/// returned handles keep the watches alive; dropping them stops watching.
pub fn watch_routes(
    routes: &RouteCollection,
    excludes: &[String],
    lull: Duration,
    reloader: Arc<dyn Reloader>,
) -> Result<Vec<Watcher>> {
    let mut watchers = Vec::new();
    for route in routes.iter() {
        let Some(root) = route.endpoint.watch_root() else {
            continue;
        };

        let mut config = WatchConfig::new(root).with_lull(lull);
        config.excludes = excludes.to_vec();
        let (watcher, mut changes) = watch(config)?;

        let prefix = route.path.clone();
        let reloader = Arc::clone(&reloader);
        let span = info_span!("route", route = %route.mux_match());
        tokio::spawn(
            async move {
                while let Some(changeset) = changes.recv().await {
                    let paths: Vec<String> = changeset
                        .all()
                        .iter()
                        .map(|path| url_path(&prefix, path))
                        .collect();
                    if !paths.is_empty() {
                        reloader.reload(&paths);
                    }
                }
            }
            .instrument(span),
        );
        watchers.push(watcher);
    }
    Ok(watchers)
}

/// Place a watcher path under a route's URL path. Paths outside the route
/// root are already absolute and are kept as they are.
fn url_path(prefix: &str, path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    format!("{}/{path}", prefix.trim_end_matches('/'))
}
