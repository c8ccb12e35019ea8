//! End-to-end tests for watching a real directory tree.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devd_directory_watcher::{Changeset, WatchConfig, list, watch};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{sleep, timeout};

const LULL: Duration = Duration::from_millis(200);
const SETTLE: Duration = Duration::from_millis(100);
const DEADLINE: Duration = Duration::from_secs(5);

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Create a root containing `a/a.txt` and `b/b.txt`.
fn fixture() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().canonicalize().unwrap();
    for file in ["a/a.txt", "b/b.txt"] {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"initial").unwrap();
    }
    (temp_dir, root)
}

fn append(path: &Path) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    writeln!(file, "more").unwrap();
}

#[tokio::test]
async fn test_changes_within_one_lull_form_one_changeset() {
    let (_temp_dir, root) = fixture();
    let (watcher, mut rx) = watch(WatchConfig::new(&root).with_lull(LULL)).unwrap();
    sleep(SETTLE).await;

    append(&root.join("a/a.txt"));
    fs::write(root.join("c.txt"), b"new").unwrap();

    // Nothing is published before the lull.
    assert!(rx.try_recv().is_err());

    let changeset = timeout(DEADLINE, rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        changeset,
        Changeset {
            added: strings(&["c.txt"]),
            changed: strings(&["a/a.txt"]),
            deleted: Vec::new(),
        }
    );
    watcher.stop();
}

#[tokio::test]
async fn test_rename_and_remove() {
    let (_temp_dir, root) = fixture();
    let (watcher, mut rx) = watch(WatchConfig::new(&root).with_lull(LULL)).unwrap();
    sleep(SETTLE).await;

    fs::rename(root.join("a/a.txt"), root.join("a/moved.txt")).unwrap();
    fs::remove_file(root.join("b/b.txt")).unwrap();

    let changeset = timeout(DEADLINE, rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        changeset,
        Changeset {
            added: strings(&["a/moved.txt"]),
            changed: Vec::new(),
            deleted: strings(&["a/a.txt", "b/b.txt"]),
        }
    );
    watcher.stop();
}

#[tokio::test]
async fn test_excluded_files_are_not_reported() {
    let (_temp_dir, root) = fixture();
    let config = WatchConfig::new(&root).with_lull(LULL).exclude("**/*.tmp");
    let (watcher, mut rx) = watch(config).unwrap();
    sleep(SETTLE).await;

    fs::write(root.join("scratch.tmp"), b"x").unwrap();
    fs::write(root.join("b/kept.txt"), b"x").unwrap();

    let changeset = timeout(DEADLINE, rx.recv()).await.unwrap().unwrap();
    assert_eq!(changeset.added, strings(&["b/kept.txt"]));
    assert_eq!(changeset.all(), strings(&["b/kept.txt"]));
    watcher.stop();
}

#[tokio::test]
async fn test_stop_is_terminal() {
    let (_temp_dir, root) = fixture();
    let (watcher, mut rx) = watch(WatchConfig::new(&root).with_lull(LULL)).unwrap();
    sleep(SETTLE).await;

    fs::write(root.join("pending.txt"), b"x").unwrap();
    watcher.stop();
    assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));

    fs::write(root.join("late.txt"), b"x").unwrap();
    sleep(LULL * 2).await;
    assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    assert!(watcher.is_stopped());
}

#[tokio::test]
async fn test_dropping_the_handle_closes_the_channel() {
    let (_temp_dir, root) = fixture();
    let (watcher, mut rx) = watch(WatchConfig::new(&root).with_lull(LULL)).unwrap();
    drop(watcher);

    assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
}

#[tokio::test]
async fn test_malformed_patterns_do_not_change_output() {
    let (_temp_dir, root) = fixture();
    let config = WatchConfig::new(&root)
        .with_lull(LULL)
        .with_includes(["**", "[broken"])
        .exclude("{oops")
        .exclude("**/*.tmp");
    let (watcher, mut rx) = watch(config).unwrap();
    sleep(SETTLE).await;

    fs::write(root.join("scratch.tmp"), b"x").unwrap();
    fs::write(root.join("[broken"), b"x").unwrap();
    append(&root.join("b/b.txt"));

    let changeset = timeout(DEADLINE, rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        changeset,
        Changeset {
            added: strings(&["[broken"]),
            changed: strings(&["b/b.txt"]),
            deleted: Vec::new(),
        }
    );
    watcher.stop();
}

#[cfg(unix)]
#[tokio::test]
async fn test_paths_are_relative_through_a_symlinked_root() {
    let (_temp_dir, root) = fixture();
    std::os::unix::fs::symlink("a", root.join("link")).unwrap();
    let outer = TempDir::new().unwrap();
    let root_link = outer.path().join("project");
    std::os::unix::fs::symlink(&root, &root_link).unwrap();

    let config = WatchConfig::new(&root_link)
        .with_lull(LULL)
        .with_includes(["link/**", "b/**"]);
    let (watcher, mut rx) = watch(config).unwrap();
    sleep(SETTLE).await;

    append(&root.join("a/a.txt"));
    fs::write(root.join("b/new.txt"), b"x").unwrap();

    let changeset = timeout(DEADLINE, rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        changeset,
        Changeset {
            added: strings(&["b/new.txt"]),
            changed: strings(&["a/a.txt"]),
            deleted: Vec::new(),
        }
    );
    assert_eq!(
        list(&root_link, &strings(&["link/**", "b/**"]), &[]).unwrap(),
        strings(&["a/a.txt", "b/b.txt", "b/new.txt"])
    );
    watcher.stop();
}

#[test]
fn test_list_matches_watch_paths() {
    let (_temp_dir, root) = fixture();
    assert_eq!(
        list(&root, &strings(&["**"]), &[]).unwrap(),
        strings(&["a/a.txt", "b/b.txt"])
    );
}
