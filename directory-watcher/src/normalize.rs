//! Path normalization against watch roots.
//!
//! Every path a watcher emits is slash-delimited. A path under one of the
//! supplied bases is made relative to the first such base; anything else
//! keeps its absolute form.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;

use crate::error::{Result, WatchError};

/// Make a path absolute and lexically clean (`.` and `..` resolved).
pub fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(path.absolutize()?.into_owned())
}

/// Resolve a watch root to the directory it really names.
///
/// Symlinks anywhere along the root are resolved, so the result compares
/// equal to paths the OS reports and to canonicalized link targets below it.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let root = absolute(root)?;
    match fs::canonicalize(&root) {
        Ok(resolved) if resolved.is_dir() => Ok(resolved),
        _ => Err(WatchError::RootNotFound(root)),
    }
}

/// Render a path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if cfg!(windows) {
        rendered.replace('\\', "/")
    } else {
        rendered.into_owned()
    }
}

/// Returns true if `child` is `parent` or lives below it.
///
/// Comparison is per component, so `/foo` is not a parent of `/foobar`.
pub fn is_under(parent: &Path, child: &Path) -> bool {
    child.starts_with(parent)
}

/// Normalize one path against a list of absolute bases.
pub fn normalize_path(bases: &[PathBuf], path: &Path) -> Result<String> {
    let path = absolute(path)?;
    for base in bases {
        if let Ok(relative) = path.strip_prefix(base) {
            if relative.as_os_str().is_empty() {
                return Ok(".".to_string());
            }
            return Ok(to_slash(relative));
        }
    }
    Ok(to_slash(&path))
}

/// Normalize a list of paths, keeping their order.
pub fn normalize_paths<S: AsRef<str>>(bases: &[PathBuf], paths: &[S]) -> Result<Vec<String>> {
    let bases = bases
        .iter()
        .map(|base| absolute(base.as_path()))
        .collect::<Result<Vec<_>>>()?;
    paths
        .iter()
        .map(|path| normalize_path(&bases, Path::new(&*native(path.as_ref()))))
        .collect()
}

/// Convert a slash-delimited path into the native separator.
pub(crate) fn native(path: &str) -> Cow<'_, str> {
    if cfg!(windows) {
        Cow::Owned(path.replace('/', "\\"))
    } else {
        Cow::Borrowed(path)
    }
}
