//! End-to-end CLI tests for gchatlog.
//!
//! These tests run the actual binary against small archives written into a
//! temporary directory and check the files it leaves behind.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test cli_e2e
//! ```

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

// ============================================================================
// Test Fixtures
// ============================================================================

fn record(thread: &str, from: &str, to: &str, date: &str, body: &str) -> String {
    format!(
        "From 1@xxx Sat Sep 14 00:00:00 2013\n\
         X-GM-THRID: {thread}\n\
         X-Gmail-Labels: Chat\n\
         From: {from}\n\
         To: {to}\n\
         Date: {date}\n\
         Content-Type: text/html; charset=UTF-8\n\
         \n\
         {body}\n\n"
    )
}

/// Writes a small archive with two correspondents, one ordinary mail and a
/// thread with an out-of-order timestamp.
fn setup_archive() -> TempDir {
    let dir = tempdir().expect("Failed to create temp dir");

    let mut mbox = String::new();
    mbox.push_str(&record("100", "alice@example.com", "me@example.com", "Sat, 14 Sep 2013 10:00:00 +0000", "hi there"));
    mbox.push_str(&record("100", "me@example.com", "alice@example.com", "Sat, 14 Sep 2013 10:05:00 +0000", "hello alice"));
    mbox.push_str(&record("100", "alice@example.com", "me@example.com", "Sat, 14 Sep 2013 10:02:00 +0000", "out of order"));
    mbox.push_str(&record("200", "me@example.com", "bob@example.com", "Sun, 15 Sep 2013 08:00:00 +0000", "morning bob<br>second line"));
    mbox.push_str(&record("200", "bob@example.com", "me@example.com", "Sun, 15 Sep 2013 08:01:00 +0000", "morning"));
    mbox.push_str("From 9@xxx\nFrom: news@example.com\nSubject: newsletter\n\nnot a chat\n\n");
    fs::write(dir.path().join("archive.mbox"), mbox).unwrap();

    dir
}

fn gchatlog() -> Command {
    let mut cmd = Command::cargo_bin("gchatlog").unwrap();
    // keep transcript dates stable regardless of the machine
    cmd.env("TZ", "UTC");
    cmd
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

// ============================================================================
// Basic functionality
// ============================================================================

#[test]
fn test_basic_run_writes_transcripts_and_records() {
    let dir = setup_archive();
    let out = dir.path().join("out");

    gchatlog()
        .arg(dir.path().join("archive.mbox"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Done!"))
        .stdout(predicate::str::contains("Conversations: 2"));

    assert!(out.join("text/alice@example.com.txt").exists());
    assert!(out.join("text/bob@example.com.txt").exists());
    assert!(out.join("records/100.json").exists());
    assert!(out.join("records/200.json").exists());

    let alice = read(&out.join("text/alice@example.com.txt"));
    assert!(alice.starts_with(&"-".repeat(40)));
    assert!(alice.contains("2013-09-14"));
}

#[test]
fn test_alias_file_created_on_first_run() {
    let dir = setup_archive();
    let out = dir.path().join("out");

    gchatlog()
        .arg(dir.path().join("archive.mbox"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("alias file has been created"));

    let aliases = read(&out.join("aliases.txt"));
    assert!(aliases.contains("operator_self me@example.com"));
    assert!(aliases.contains("\nalice@example.com\n"));
    assert!(aliases.contains("\nbob@example.com\n"));
}

#[test]
fn test_edited_alias_file_renames_people() {
    let dir = setup_archive();
    let out = dir.path().join("out");
    let archive = dir.path().join("archive.mbox");

    gchatlog().arg(&archive).arg("-o").arg(&out).assert().success();

    let edited = read(&out.join("aliases.txt")).replace("alice@example.com\n", "alice@example.com Alice\n");
    fs::write(out.join("aliases.txt"), edited).unwrap();

    gchatlog()
        .arg(&archive)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("alias file has been created").not());

    assert!(out.join("text/Alice.txt").exists());
    // stale transcript from the first run is gone
    assert!(!out.join("text/alice@example.com.txt").exists());
    assert!(read(&out.join("text/Alice.txt")).contains("Alice:"));
}

#[test]
fn test_explicit_alias_path() {
    let dir = setup_archive();
    let out = dir.path().join("out");
    let aliases = dir.path().join("names.txt");
    fs::write(&aliases, "operator_self me@example.com\nbob@example.com Bobby\n").unwrap();

    gchatlog()
        .arg(dir.path().join("archive.mbox"))
        .arg("-o")
        .arg(&out)
        .arg("--aliases")
        .arg(&aliases)
        .assert()
        .success();

    assert!(out.join("text/Bobby.txt").exists());
    assert!(!out.join("aliases.txt").exists());
}

// ============================================================================
// Flags
// ============================================================================

#[test]
fn test_analyze_reports_out_of_order() {
    let dir = setup_archive();

    gchatlog()
        .arg(dir.path().join("archive.mbox"))
        .arg("-o")
        .arg(dir.path().join("out"))
        .arg("--analyze")
        .assert()
        .success()
        .stdout(predicate::str::contains("Out-of-order timestamps: 1"))
        .stdout(predicate::str::contains("thread 100"));
}

#[test]
fn test_no_wrap_keeps_line_breaks() {
    let dir = setup_archive();
    let out = dir.path().join("out");

    gchatlog()
        .arg(dir.path().join("archive.mbox"))
        .arg("-o")
        .arg(&out)
        .arg("--no-wrap")
        .assert()
        .success();

    let bob = read(&out.join("text/bob@example.com.txt"));
    assert!(bob.contains("morning bob\n"));
    assert!(bob.contains("   second line\n"));

    let wrapped_out = dir.path().join("wrapped");
    gchatlog()
        .arg(dir.path().join("archive.mbox"))
        .arg("-o")
        .arg(&wrapped_out)
        .assert()
        .success();
    assert!(read(&wrapped_out.join("text/bob@example.com.txt")).contains("morning bob second line"));
}

#[test]
fn test_jsonl_format() {
    let dir = setup_archive();
    let out = dir.path().join("out");

    gchatlog()
        .arg(dir.path().join("archive.mbox"))
        .arg("-o")
        .arg(&out)
        .args(["--format", "jsonl"])
        .assert()
        .success();

    let record = read(&out.join("records/200.jsonl"));
    assert_eq!(record.lines().count(), 3);
    for line in record.lines() {
        let _: serde_json::Value = serde_json::from_str(line).unwrap();
    }
}

#[test]
fn test_idempotent_output() {
    let dir = setup_archive();
    let archive = dir.path().join("archive.mbox");
    let out = dir.path().join("out");

    gchatlog().arg(&archive).arg("-o").arg(&out).assert().success();
    let first_text = read(&out.join("text/alice@example.com.txt"));
    let first_record = read(&out.join("records/100.json"));

    gchatlog().arg(&archive).arg("-o").arg(&out).assert().success();
    assert_eq!(read(&out.join("text/alice@example.com.txt")), first_text);
    assert_eq!(read(&out.join("records/100.json")), first_record);
}

#[test]
fn test_rust_log_overrides_default_level() {
    let dir = setup_archive();

    gchatlog()
        .env("RUST_LOG", "info")
        .arg(dir.path().join("archive.mbox"))
        .arg("-o")
        .arg(dir.path().join("out"))
        .assert()
        .success()
        .stderr(predicate::str::contains("messages grouped"));
}

#[test]
fn test_quiet_by_default() {
    let dir = setup_archive();

    gchatlog()
        .env_remove("RUST_LOG")
        .arg(dir.path().join("archive.mbox"))
        .arg("-o")
        .arg(dir.path().join("out"))
        .assert()
        .success()
        .stderr(predicate::str::contains("messages grouped").not());
}

// ============================================================================
// Error handling
// ============================================================================

#[test]
fn test_missing_archive_fails_cleanly() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");

    gchatlog()
        .arg(dir.path().join("nope.mbox"))
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));

    assert!(!out.join("text").exists());
}

#[test]
fn test_bad_alias_file_fails() {
    let dir = setup_archive();
    let aliases = dir.path().join("bad.txt");
    fs::write(&aliases, "operator_self\n").unwrap();

    gchatlog()
        .arg(dir.path().join("archive.mbox"))
        .arg("-o")
        .arg(dir.path().join("out"))
        .arg("--aliases")
        .arg(&aliases)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1"))
        .stderr(predicate::str::contains("bad.txt"));
}

#[test]
fn test_unknown_format_rejected() {
    let dir = setup_archive();
    gchatlog()
        .arg(dir.path().join("archive.mbox"))
        .args(["--format", "csv"])
        .assert()
        .failure();
}

#[test]
fn test_empty_archive_succeeds() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("empty.mbox"), "").unwrap();

    gchatlog()
        .arg(dir.path().join("empty.mbox"))
        .arg("-o")
        .arg(dir.path().join("out"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Conversations: 0"));
}

#[test]
fn test_help() {
    gchatlog()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-wrap"))
        .stdout(predicate::str::contains("--analyze"));
}
