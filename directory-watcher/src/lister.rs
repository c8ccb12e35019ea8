//! One-shot inventory of the files a watch could report.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::Result;
use crate::filter::{self, BaseDirs, base_dirs, valid_patterns};
use crate::normalize::{normalize_path, resolve_root};
use crate::pattern::match_any;

/// List every file under `root` that passes the include and exclude
/// patterns.
///
/// Paths use the same form as changesets from a watch with the same
/// arguments: slash-delimited, relative to the root when under it and
/// absolute otherwise. The result is sorted and free of duplicates.
/// Symlinked directories are followed; a link back to one of its own
/// ancestors is skipped.
///
/// Fails with [`RootNotFound`](crate::WatchError::RootNotFound) if `root` is
/// not a directory and with [`Walk`](crate::WatchError::Walk) if a base
/// directory cannot be read. Errors
/// deeper in the tree are logged and skipped.
pub fn list(root: &Path, includes: &[String], excludes: &[String]) -> Result<Vec<String>> {
    let start = Instant::now();
    let root = resolve_root(root)?;
    let roots = [root.clone()];
    let includes = valid_patterns(includes);
    let excludes = valid_patterns(excludes);
    let BaseDirs { includes, bases } = base_dirs(&root, &includes)?;

    let mut found = BTreeSet::new();
    for base in &bases {
        let walker = WalkDir::new(base)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| !is_excluded_dir(entry, &roots, &excludes));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => return Err(err.into()),
                Err(err) => {
                    debug!("skipping during walk: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = normalize_path(&roots, entry.path())?;
            match filter::file(&path, &includes, &excludes) {
                Ok(true) => {
                    found.insert(path);
                }
                Ok(false) => {}
                Err(err) => warn!("skipping {path}: {err}"),
            }
        }
    }

    info!(
        "Listed {} files under {} in {:?}",
        found.len(),
        root.display(),
        start.elapsed()
    );
    Ok(found.into_iter().collect())
}

/// Directories are pruned only when an exclude pattern names them. The base
/// a walk starts from is never pruned: it normalizes to `.`, which patterns
/// like `.*` match.
fn is_excluded_dir(entry: &DirEntry, roots: &[PathBuf], excludes: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    normalize_path(roots, entry.path())
        .ok()
        .is_some_and(|path| match_any(&path, excludes).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatchError;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn fixture() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        for file in ["a/a.txt", "b/b.txt", "c.txt", "node_modules/x.js"] {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"x").unwrap();
        }
        (temp_dir, root)
    }

    #[test]
    fn test_list_everything() {
        let (_temp_dir, root) = fixture();
        assert_eq!(
            list(&root, &strings(&["**"]), &[]).unwrap(),
            strings(&["a/a.txt", "b/b.txt", "c.txt", "node_modules/x.js"])
        );
    }

    #[test]
    fn test_list_with_patterns() {
        let (_temp_dir, root) = fixture();
        assert_eq!(
            list(&root, &strings(&["**"]), &strings(&["node_modules/**"])).unwrap(),
            strings(&["a/a.txt", "b/b.txt", "c.txt"])
        );
        assert_eq!(
            list(&root, &strings(&["a/**", "*.txt"]), &[]).unwrap(),
            strings(&["a/a.txt", "c.txt"])
        );
        assert_eq!(
            list(&root, &strings(&["**/*.txt"]), &strings(&["b"])).unwrap(),
            strings(&["a/a.txt", "c.txt"])
        );
    }

    #[test]
    fn test_list_ignores_malformed_patterns() {
        let (_temp_dir, root) = fixture();
        assert_eq!(
            list(&root, &strings(&["[broken", "a/**"]), &strings(&["{oops"])).unwrap(),
            strings(&["a/a.txt"])
        );
    }

    #[test]
    fn test_excludes_never_prune_the_base() {
        let (_temp_dir, root) = fixture();
        fs::write(root.join(".hidden"), b"x").unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".git/HEAD"), b"x").unwrap();

        assert_eq!(
            list(&root, &strings(&["**"]), &strings(&[".*"])).unwrap(),
            strings(&["a/a.txt", "b/b.txt", "c.txt", "node_modules/x.js"])
        );
        assert_eq!(
            list(&root, &strings(&["**"]), &strings(&["**/.*"])).unwrap(),
            strings(&["a/a.txt", "b/b.txt", "c.txt", "node_modules/x.js"])
        );
        // `*` names every top-level entry, so only nested files survive.
        assert_eq!(
            list(&root, &strings(&["**"]), &strings(&["*"])).unwrap(),
            Vec::<String>::new()
        );
        // A base below the root is not pruned by an exclude that names it.
        assert_eq!(
            list(&root, &strings(&["a/**"]), &strings(&["a"])).unwrap(),
            strings(&["a/a.txt"])
        );
    }

    #[test]
    fn test_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        assert!(matches!(
            list(&missing, &strings(&["**"]), &[]),
            Err(WatchError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_unreadable_base_is_a_walk_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let err = WalkDir::new(&missing).into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.depth(), 0);
        assert!(matches!(WatchError::from(err), WatchError::Walk(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_through_symlinked_root() {
        let (_temp_dir, root) = fixture();
        std::os::unix::fs::symlink("a", root.join("link")).unwrap();
        let outer = TempDir::new().unwrap();
        let root_link = outer.path().join("root");
        std::os::unix::fs::symlink(&root, &root_link).unwrap();

        assert_eq!(
            list(&root_link, &strings(&["link/**"]), &[]).unwrap(),
            strings(&["a/a.txt"])
        );
        assert_eq!(
            list(&root_link, &strings(&["b/**", "c.txt"]), &[]).unwrap(),
            strings(&["b/b.txt", "c.txt"])
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_list_follows_symlinks() {
        let (_temp_dir, root) = fixture();
        std::os::unix::fs::symlink("../b", root.join("a/to_b")).unwrap();
        // A link back to a directory being walked must not loop forever.
        std::os::unix::fs::symlink(".", root.join("a/again")).unwrap();

        assert_eq!(
            list(&root, &strings(&["a/**"]), &[]).unwrap(),
            strings(&["a/a.txt", "a/to_b/b.txt"])
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_list_through_symlinked_prefix() {
        let (_temp_dir, root) = fixture();
        std::os::unix::fs::symlink("b", root.join("link")).unwrap();

        // The include is rebased onto the link target.
        assert_eq!(
            list(&root, &strings(&["link/**"]), &[]).unwrap(),
            strings(&["b/b.txt"])
        );
    }
}
