//! The changeset produced by one batching cycle.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PatternError, Result};
use crate::filter;
use crate::normalize::normalize_paths;

/// Files added, changed and deleted during one batching cycle.
///
/// Each list is sorted. A changeset straight out of the batcher mentions a
/// path at most once across the three lists; [`Changeset::join`] does not
/// preserve that, so consumers must tolerate overlaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// Files that appeared.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<String>,

    /// Files whose contents changed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<String>,

    /// Files that disappeared.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<String>,
}

impl Changeset {
    /// True when nothing was added, changed or deleted.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }

    /// All files that still exist: added and changed, sorted and deduplicated.
    pub fn all(&self) -> Vec<String> {
        self.added
            .iter()
            .chain(&self.changed)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Check if an added or changed file matches `path` after cleaning both.
    pub fn has(&self, path: &str) -> bool {
        let wanted = clean(path);
        self.added
            .iter()
            .chain(&self.changed)
            .any(|candidate| clean(candidate) == wanted)
    }

    /// Merge two changesets field by field.
    pub fn join(&self, other: &Changeset) -> Changeset {
        Changeset {
            added: union(&self.added, &other.added),
            changed: union(&self.changed, &other.changed),
            deleted: union(&self.deleted, &other.deleted),
        }
    }

    /// Keep only paths accepted by the include and exclude patterns.
    pub fn filter<I, E>(&self, includes: &[I], excludes: &[E]) -> std::result::Result<Changeset, PatternError>
    where
        I: AsRef<str>,
        E: AsRef<str>,
    {
        Ok(Changeset {
            added: filter::files(&self.added, includes, excludes)?,
            changed: filter::files(&self.changed, includes, excludes)?,
            deleted: filter::files(&self.deleted, includes, excludes)?,
        })
    }

    /// Rewrite every path relative to the first base that contains it.
    pub fn normalize(&self, bases: &[PathBuf]) -> Result<Changeset> {
        Ok(Changeset {
            added: normalize_paths(bases, &self.added)?,
            changed: normalize_paths(bases, &self.changed)?,
            deleted: normalize_paths(bases, &self.deleted)?,
        })
    }
}

impl fmt::Display for Changeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Added: {:?}\nDeleted: {:?}\nChanged: {:?}",
            self.added, self.deleted, self.changed
        )
    }
}

fn union(a: &[String], b: &[String]) -> Vec<String> {
    a.iter()
        .chain(b)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Lexically clean a slash-delimited path: collapse repeated separators and
/// resolve `.` and `..` components.
fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
