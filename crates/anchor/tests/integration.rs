//! Anchor lifecycle integration tests
//!
//! Exercises the full save / diff / restore / auto / stop workflow against
//! real temp directories and a real filesystem watcher.

use moor_anchor::{AnchorError, AnchorManager};
use moor_core::Store;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// How long tests wait for the tracking loop to settle after changes
const QUIESCENCE: Duration = Duration::from_millis(900);

fn setup() -> (TempDir, AnchorManager) {
    let dir = TempDir::new().unwrap();
    Store::init(dir.path()).unwrap();

    // Short debounce window keeps tracking tests fast
    std::fs::write(
        dir.path().join(".moor/config.toml"),
        "[watcher]\ndebounce_ms = 50\nbatch_ms = 50\n",
    )
    .unwrap();

    let store = Arc::new(Store::open(dir.path()).unwrap());
    let manager = AnchorManager::new(store).unwrap();
    (dir, manager)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_save_diff_restore_scenario() {
    let (dir, manager) = setup();
    let file = dir.path().join("f.txt");
    std::fs::write(&file, "x").unwrap();

    manager.save("a").await.unwrap();

    // Unchanged tree diffs empty
    assert!(manager.diff("a").await.unwrap().is_empty());

    std::fs::write(&file, "y").unwrap();

    let diff = manager.diff("a").await.unwrap();
    assert_eq!(diff.modified.len(), 1);
    assert_eq!(diff.modified[0].path, Path::new("f.txt"));
    assert!(diff.added.is_empty());
    assert!(diff.removed.is_empty());

    let report = manager.restore("a", true).await.unwrap();
    assert_eq!(report.restored, 1);
    assert!(report.failures.is_empty());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "x");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restore_reaches_saved_state_from_arbitrary_tree() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("keep.txt"), "original").unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/lib.rs"), "pub fn a() {}").unwrap();

    manager.save("baseline").await.unwrap();

    // Mutate into an arbitrary tree: edit, delete, add
    std::fs::write(dir.path().join("keep.txt"), "edited").unwrap();
    std::fs::remove_file(dir.path().join("src/lib.rs")).unwrap();
    std::fs::write(dir.path().join("stray.txt"), "extra").unwrap();

    let report = manager.restore("baseline", true).await.unwrap();
    assert_eq!(report.deleted, 1, "stray file should be deleted");

    // Restored tree is identical by path + hash
    assert!(manager.diff("baseline").await.unwrap().is_empty());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("keep.txt")).unwrap(),
        "original"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/lib.rs")).unwrap(),
        "pub fn a() {}"
    );
    assert!(!dir.path().join("stray.txt").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repeated_save_is_idempotent() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("stable.txt"), "same content").unwrap();

    let first = manager.save("idem").await.unwrap().anchor;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = manager.save("idem").await.unwrap().anchor;

    assert_eq!(first.file_tree, second.file_tree);
    assert!(second.created_at > first.created_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restore_missing_anchor() {
    let (_dir, manager) = setup();
    assert!(matches!(
        manager.restore("absent", true).await,
        Err(AnchorError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_busy_when_anchor_held() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("f.txt"), "x").unwrap();
    manager.save("held").await.unwrap();

    let _lock = manager.lock_anchor("held", true).await.unwrap();

    // No-wait operations must reject instead of interleaving
    assert!(matches!(
        manager.restore("held", false).await,
        Err(AnchorError::Busy(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tracked_anchor_converges() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("a.txt"), "one").unwrap();
    std::fs::write(dir.path().join("b.txt"), "two").unwrap();

    manager.save("live").await.unwrap();
    manager.auto("live").await.unwrap();

    // Burst of changes: edit, add, remove
    std::fs::write(dir.path().join("a.txt"), "one changed").unwrap();
    std::fs::write(dir.path().join("c.txt"), "three").unwrap();
    std::fs::remove_file(dir.path().join("b.txt")).unwrap();

    tokio::time::sleep(QUIESCENCE).await;

    // After quiescence the tracked file_tree hash-equals the live tree
    let diff = manager.diff("live").await.unwrap();
    assert!(
        diff.is_empty(),
        "tracked anchor should converge, still differs: {diff:?}"
    );

    let anchor = manager.get("live").unwrap();
    assert!(anchor.tracked);
    assert!(anchor.file_tree.contains(Path::new("c.txt")));
    assert!(!anchor.file_tree.contains(Path::new("b.txt")));

    manager.stop("live").await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_auto_twice_is_noop() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("f.txt"), "x").unwrap();
    manager.save("once").await.unwrap();

    let first = manager.auto("once").await.unwrap();
    let second = manager.auto("once").await.unwrap();
    assert_eq!(first, second, "auto on a tracking anchor reports the existing session");

    manager.stop("once").await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_halts_mutation() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("f.txt"), "before").unwrap();
    manager.save("halted").await.unwrap();

    manager.auto("halted").await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stopped = manager.stop("halted").await.unwrap();
    assert!(stopped);

    let anchor = manager.get("halted").unwrap();
    assert!(!anchor.tracked, "stop must persist tracked = false");
    assert!(anchor.tracking_session.is_none());

    // Changes after stop never reach the anchor
    std::fs::write(dir.path().join("f.txt"), "after stop").unwrap();
    tokio::time::sleep(QUIESCENCE).await;

    let anchor = manager.get("halted").unwrap();
    let entry = anchor.file_tree.get(Path::new("f.txt")).unwrap();
    assert_eq!(entry.hash, moor_core::hash_bytes(b"before"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_applies_pending_events_first() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("f.txt"), "v0").unwrap();
    manager.save("drain").await.unwrap();

    manager.auto("drain").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Change then stop immediately; the pending event must still land
    std::fs::write(dir.path().join("f.txt"), "v1").unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    manager.stop("drain").await.unwrap();

    let anchor = manager.get("drain").unwrap();
    let entry = anchor.file_tree.get(Path::new("f.txt")).unwrap();
    assert_eq!(
        entry.hash,
        moor_core::hash_bytes(b"v1"),
        "stop must drain the in-flight event before returning"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remove_anchor() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("f.txt"), "x").unwrap();
    manager.save("doomed").await.unwrap();

    manager.remove("doomed").await.unwrap();
    assert!(matches!(
        manager.get("doomed"),
        Err(AnchorError::NotFound(_))
    ));

    assert!(matches!(
        manager.remove("doomed").await,
        Err(AnchorError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remove_tracked_anchor_is_busy() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("f.txt"), "x").unwrap();
    manager.save("pinned").await.unwrap();
    manager.auto("pinned").await.unwrap();

    assert!(matches!(
        manager.remove("pinned").await,
        Err(AnchorError::Busy(_))
    ));

    manager.stop("pinned").await.unwrap();
    manager.remove("pinned").await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_save_preserves_tracked_flag() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("f.txt"), "x").unwrap();
    manager.save("resave").await.unwrap();
    manager.auto("resave").await.unwrap();

    manager.save("resave").await.unwrap();
    let anchor = manager.get("resave").unwrap();
    assert!(anchor.tracked, "manual save must not silently drop tracking");

    manager.stop("resave").await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_identical_content_shares_blobs() {
    let (dir, manager) = setup();
    std::fs::write(dir.path().join("one.txt"), "duplicate content").unwrap();
    std::fs::write(dir.path().join("two.txt"), "duplicate content").unwrap();

    let anchor = manager.save("dedup").await.unwrap().anchor;
    let one = anchor.file_tree.get(Path::new("one.txt")).unwrap();
    let two = anchor.file_tree.get(Path::new("two.txt")).unwrap();
    assert_eq!(one.hash, two.hash, "identical content must share one blob");
}
