//! Existence checks used to disambiguate filesystem events.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Answers "does this path currently exist as a regular file".
///
/// Failing to stat a path and the path not existing are the same answer.
pub trait ExistenceCheck: Send + Sync {
    /// Check whether `path` is an existing regular file.
    fn check(&self, path: &Path) -> bool;
}

/// Stats the real filesystem. Symlinks are followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatExistence;

impl ExistenceCheck for StatExistence {
    fn check(&self, path: &Path) -> bool {
        path.metadata().is_ok_and(|metadata| metadata.is_file())
    }
}

/// A fixed set of paths that "exist". Used to drive the batcher in tests.
#[derive(Debug, Clone, Default)]
pub struct ExistenceMap {
    paths: HashSet<PathBuf>,
}

impl ExistenceMap {
    /// Create a map where exactly the given paths exist.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Mark a path as existing.
    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(path.into());
    }

    /// Mark a path as gone.
    pub fn remove(&mut self, path: &Path) {
        self.paths.remove(path);
    }
}

impl ExistenceCheck for ExistenceMap {
    fn check(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_stat_existence() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"x").unwrap();

        assert!(StatExistence.check(&file));
        // Directories never count.
        assert!(!StatExistence.check(temp_dir.path()));
        assert!(!StatExistence.check(&temp_dir.path().join("missing")));
    }

    #[test]
    fn test_existence_map() {
        let mut map = ExistenceMap::new(["foo"]);
        assert!(map.check(Path::new("foo")));
        assert!(!map.check(Path::new("bar")));

        map.insert("bar");
        map.remove(Path::new("foo"));
        assert!(map.check(Path::new("bar")));
        assert!(!map.check(Path::new("foo")));
    }
}
