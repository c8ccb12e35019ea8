//! # Directory Watcher
//!
//! This crate turns raw filesystem notifications into clean changesets for
//! devd's live reload. It subscribes to the directories a set of include
//! patterns needs, batches bursts of events until the stream goes quiet, and
//! reports what was added, changed and deleted.
//!
//! ## Features
//!
//! - **Event Batching**: Bursts of changes become a single changeset
//! - **Rename Resolution**: Ambiguous rename and transient-file events are
//!   settled against the filesystem
//! - **Glob Filtering**: `**`, character classes, brace alternatives
//! - **Path Normalization**: Paths are reported relative to the watch root
//! - **Listing**: One-shot inventory with the same filtering as a watch
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  notify ──► RawEvent ──► Batcher ──► normalize ──► filter ──►   │
//! │                             │                         │         │
//! │                             ▼                         ▼         │
//! │                      ExistenceCheck          Changeset channel  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod batch;
pub mod changeset;
pub mod config;
pub mod error;
pub mod event;
pub mod exists;
pub mod filter;
pub mod lister;
pub mod normalize;
pub mod pattern;
pub mod watcher;

pub use batch::{Accumulator, Batcher, CycleState, MAX_LULL_WAIT};
pub use changeset::Changeset;
pub use config::WatchConfig;
pub use error::{PatternError, Result, WatchError};
pub use event::{RawEvent, RawEventKind};
pub use exists::{ExistenceCheck, ExistenceMap, StatExistence};
pub use lister::list;
pub use watcher::{Watcher, watch};
