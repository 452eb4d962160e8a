//! Binary-level workflow tests for the moor CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn moor(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("moor").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn test_init_creates_store() {
    let dir = tempfile::tempdir().unwrap();

    moor(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized moor store"));

    assert!(dir.path().join(".moor/config.toml").exists());
    assert!(dir.path().join(".moor/objects/blobs").exists());
}

#[test]
fn test_init_twice_fails() {
    let dir = tempfile::tempdir().unwrap();

    moor(dir.path()).arg("init").assert().success();
    moor(dir.path()).arg("init").assert().failure();
}

#[test]
fn test_commands_outside_project_fail() {
    let dir = tempfile::tempdir().unwrap();

    moor(dir.path())
        .args(["save", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("moor init"));
}

#[test]
fn test_save_diff_restore_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("f.txt");

    moor(dir.path()).arg("init").assert().success();
    std::fs::write(&file, "x").unwrap();

    moor(dir.path())
        .args(["save", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved anchor"));

    // No changes yet
    moor(dir.path())
        .args(["diff", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes"));

    // Modify and diff
    std::fs::write(&file, "y").unwrap();
    moor(dir.path())
        .args(["diff", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Modified files"))
        .stdout(predicate::str::contains("f.txt"));

    // Restore returns the file to its saved content
    moor(dir.path())
        .args(["restore", "a", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored"));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "x");
}

#[test]
fn test_restore_deletes_stray_files() {
    let dir = tempfile::tempdir().unwrap();

    moor(dir.path()).arg("init").assert().success();
    std::fs::write(dir.path().join("keep.txt"), "k").unwrap();

    moor(dir.path()).args(["save", "base"]).assert().success();

    std::fs::write(dir.path().join("stray.txt"), "s").unwrap();
    moor(dir.path())
        .args(["restore", "base", "-y"])
        .assert()
        .success();

    assert!(dir.path().join("keep.txt").exists());
    assert!(!dir.path().join("stray.txt").exists());
}

#[test]
fn test_list_and_show() {
    let dir = tempfile::tempdir().unwrap();

    moor(dir.path()).arg("init").assert().success();
    std::fs::write(dir.path().join("a.txt"), "a").unwrap();

    moor(dir.path()).args(["save", "first"]).assert().success();

    moor(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("first"));

    moor(dir.path())
        .args(["show", "first"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Anchor: first"))
        .stdout(predicate::str::contains("a.txt"));
}

#[test]
fn test_remove_anchor() {
    let dir = tempfile::tempdir().unwrap();

    moor(dir.path()).arg("init").assert().success();
    std::fs::write(dir.path().join("a.txt"), "a").unwrap();
    moor(dir.path()).args(["save", "doomed"]).assert().success();

    moor(dir.path())
        .args(["remove", "doomed"])
        .assert()
        .success();

    moor(dir.path())
        .args(["show", "doomed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_record_and_play_journey() {
    let dir = tempfile::tempdir().unwrap();
    moor(dir.path()).arg("init").assert().success();

    // Two steps, the second with a non-zero recorded exit status
    moor(dir.path())
        .args(["record", "j"])
        .write_stdin("echo hi\nfalse\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("recorded with 2 step(s)"));

    // Non-strict replay executes both steps and does not fail: the second
    // step reproduces its recorded exit status, so there is no divergence.
    moor(dir.path())
        .args(["play", "j"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 step(s) executed"));

    moor(dir.path())
        .arg("journeys")
        .assert()
        .success()
        .stdout(predicate::str::contains("j"));
}

#[test]
fn test_play_dry_run_executes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    moor(dir.path()).arg("init").assert().success();

    moor(dir.path())
        .args(["record", "touchy"])
        .write_stdin("touch created-by-replay.txt\nstop\n")
        .assert()
        .success();
    std::fs::remove_file(dir.path().join("created-by-replay.txt")).unwrap();

    moor(dir.path())
        .args(["play", "touchy", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("none executed"));

    assert!(
        !dir.path().join("created-by-replay.txt").exists(),
        "dry run must not run commands"
    );
}

#[test]
fn test_journey_export_import_roundtrip() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let export_file = source.path().join("j.journey.json");

    moor(source.path()).arg("init").assert().success();
    moor(target.path()).arg("init").assert().success();

    moor(source.path())
        .args(["record", "shared"])
        .write_stdin("echo portable\n")
        .assert()
        .success();

    moor(source.path())
        .args(["export-journey", "shared", export_file.to_str().unwrap()])
        .assert()
        .success();

    moor(target.path())
        .args(["import-journey", export_file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported journey"));

    moor(target.path())
        .args(["play", "shared"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 step(s) executed"));
}

#[test]
fn test_anchor_export_import_roundtrip() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let export_file = source.path().join("a.anchor.json");

    moor(source.path()).arg("init").assert().success();
    std::fs::write(source.path().join("f.txt"), "content").unwrap();
    moor(source.path()).args(["save", "a"]).assert().success();

    moor(source.path())
        .args(["export-anchor", "a", export_file.to_str().unwrap()])
        .assert()
        .success();

    moor(target.path()).arg("init").assert().success();
    moor(target.path())
        .args(["import-anchor", export_file.to_str().unwrap()])
        .assert()
        .success();

    moor(target.path())
        .args(["show", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("f.txt"));
}

#[test]
fn test_stop_without_tracking() {
    let dir = tempfile::tempdir().unwrap();
    moor(dir.path()).arg("init").assert().success();

    moor(dir.path())
        .args(["stop", "nothing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not being tracked"));
}

#[test]
fn test_status() {
    let dir = tempfile::tempdir().unwrap();
    moor(dir.path()).arg("init").assert().success();
    std::fs::write(dir.path().join("f.txt"), "x").unwrap();
    moor(dir.path()).args(["save", "a"]).assert().success();

    moor(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Anchors:  1"))
        .stdout(predicate::str::contains("Journeys: 0"));
}
