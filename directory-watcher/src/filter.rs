//! Include/exclude filtering of path lists, and the base directories a set
//! of include patterns needs watched.
//!
//! A path passes when at least one include pattern matches it and no exclude
//! pattern does. The functions here surface pattern errors to the caller;
//! long-running consumers (the watcher and the lister) run patterns through
//! [`valid_patterns`] first so that a typo in one pattern can never abort a
//! batch.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PatternError, WatchError};
use crate::normalize::{absolute, is_under, native, normalize_path, resolve_root};
use crate::pattern::{match_any, split_pattern, validate};

/// Decide whether a single path passes the filter.
pub fn file<I, E>(path: &str, includes: &[I], excludes: &[E]) -> Result<bool, PatternError>
where
    I: AsRef<str>,
    E: AsRef<str>,
{
    if !match_any(path, includes)? {
        return Ok(false);
    }
    Ok(!match_any(path, excludes)?)
}

/// Filter a list of paths, preserving input order.
pub fn files<I, E>(
    paths: &[String],
    includes: &[I],
    excludes: &[E],
) -> Result<Vec<String>, PatternError>
where
    I: AsRef<str>,
    E: AsRef<str>,
{
    let mut kept = Vec::with_capacity(paths.len());
    for path in paths {
        if file(path, includes, excludes)? {
            kept.push(path.clone());
        }
    }
    Ok(kept)
}

/// Keep the well-formed patterns, logging and dropping the rest.
///
/// A dropped pattern matches nothing: a malformed include selects no files
/// and a malformed exclude hides no files.
pub fn valid_patterns(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .filter(|pattern| match validate(pattern) {
            Ok(()) => true,
            Err(err) => {
                warn!("ignoring malformed pattern: {err}");
                false
            }
        })
        .cloned()
        .collect()
}

/// Directories to watch for a set of include patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDirs {
    /// The include patterns, rebased where their literal prefix is a symlink.
    pub includes: Vec<String>,

    /// Minimal set of absolute directories covering every include.
    pub bases: Vec<PathBuf>,
}

/// Work out which directories must be watched for `includes` under `root`.
///
/// Each include is split at its first metacharacter and the literal prefix
/// is joined to the root. If that path is a symlink, the include is rebased
/// onto the link target so the paths the OS reports still match it, and the
/// target becomes the base. Otherwise the base is the nearest existing
/// directory enclosing the prefix, or the root when there is none.
///
/// The root is resolved through any symlinks first; the returned bases are
/// all under the resolved form.
pub fn base_dirs(root: &Path, includes: &[String]) -> Result<BaseDirs, WatchError> {
    let root = resolve_root(root)?;
    let mut rebased = Vec::with_capacity(includes.len());
    let mut bases = Vec::with_capacity(includes.len());

    for include in includes {
        let (prefix, trailer) = split_pattern(include);
        let literal = literal_path(&root, prefix)?;

        let is_link = fs::symlink_metadata(&literal)
            .is_ok_and(|metadata| metadata.file_type().is_symlink());
        let target = if is_link {
            match fs::canonicalize(&literal) {
                Ok(target) => Some(target),
                Err(err) => {
                    debug!("dangling symlink {}: {err}", literal.display());
                    None
                }
            }
        } else {
            None
        };

        match target {
            Some(target) => {
                let shown = normalize_path(std::slice::from_ref(&root), &target)?;
                rebased.push(if trailer.is_empty() {
                    shown
                } else {
                    format!("{}/{trailer}", shown.trim_end_matches('/'))
                });
                let base = if target.is_file() {
                    target.parent().map(Path::to_path_buf).unwrap_or(target)
                } else {
                    target
                };
                bases.push(base);
            }
            None => {
                rebased.push(include.clone());
                bases.push(enclosing_dir(&literal).unwrap_or_else(|| root.clone()));
            }
        }
    }

    Ok(BaseDirs {
        includes: rebased,
        bases: minimize(bases),
    })
}

/// Join a literal pattern prefix onto the root.
///
/// Rebuilt from components: a trailing separator would make lstat follow a
/// symlink instead of reporting it.
fn literal_path(root: &Path, prefix: &str) -> Result<PathBuf, WatchError> {
    let joined = root.join(&*native(prefix));
    Ok(absolute(&joined)?.components().collect())
}

fn enclosing_dir(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|candidate| {
            fs::symlink_metadata(candidate).is_ok_and(|metadata| metadata.is_dir())
        })
        .map(Path::to_path_buf)
}

/// Drop every base that lives under another base.
fn minimize(bases: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut kept: Vec<PathBuf> = Vec::with_capacity(bases.len());
    for base in bases {
        if kept.iter().any(|existing| is_under(existing, &base)) {
            continue;
        }
        kept.retain(|existing| !is_under(&base, existing));
        kept.push(base);
    }
    kept
}
