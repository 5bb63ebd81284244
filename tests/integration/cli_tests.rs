//! Integration tests for the CLI binary.
//!
//! This test is registered as a [[test]] in the stampbook-cli crate
//! so that CARGO_BIN_EXE_stamp is available. Every test runs against its
//! own temporary `--home`.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `stamp` binary.
fn stamp_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stamp"));
    cmd.env_remove("STAMPBOOK_HOME");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    stamp_binary()
        .arg("--home")
        .arg(home)
        .args(args)
        .output()
        .expect("failed to execute stamp")
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let output = run(home, args);
    assert!(
        output.status.success(),
        "stamp {args:?} failed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn cli_responds_to_help() {
    let output = stamp_binary()
        .arg("--help")
        .output()
        .expect("failed to execute stamp --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Usage") && stdout.contains("claim"),
        "stamp --help output should list subcommands, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = stamp_binary()
        .arg("--version")
        .output()
        .expect("failed to execute stamp --version");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0.1"), "got: {stdout}");
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = stamp_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute stamp");
    assert!(!output.status.success());
}

#[test]
fn cli_full_claim_flow() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path();

    run_ok(home, &["keygen", "alice"]);
    let out = run_ok(home, &["keygen", "bob"]);
    assert!(out.contains("Principal: 0x"));

    let out = run_ok(home, &["--as", "alice", "mint"]);
    assert!(out.contains("Minted passport #1"), "got: {out}");

    let out = run_ok(home, &["--as", "bob", "event", "create", "--name", "Launch party"]);
    assert!(out.contains("Created event #1"), "got: {out}");

    let out = run_ok(home, &["event", "show", "1"]);
    assert!(out.contains("Launch party"));

    let payload = run_ok(home, &["--as", "bob", "sign", "--event", "1"]);
    let payload = payload.trim();

    let report = run_ok(home, &["--as", "alice", "claim", payload, "--dry-run"]);
    assert!(report.contains("\"is_valid\": true"), "got: {report}");

    let out = run_ok(home, &["--as", "alice", "claim", payload]);
    assert!(out.contains("Claimed stamp #1"), "got: {out}");

    let out = run_ok(home, &["stamps", "alice"]);
    assert!(out.contains("Launch party"));

    // Replaying the same payload fails.
    let output = run(home, &["--as", "alice", "claim", payload]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:") && stderr.contains("Nonce"), "got: {stderr}");

    let status = run_ok(home, &["status"]);
    assert!(status.contains("Stamps:     1"), "got: {status}");
}

#[test]
fn cli_sign_requires_event_signer() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path();

    run_ok(home, &["keygen", "organizer"]);
    run_ok(home, &["keygen", "stranger"]);
    run_ok(home, &["--as", "organizer", "event", "create", "--name", "Meetup"]);

    let output = run(home, &["--as", "stranger", "sign", "--event", "1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not the signer"));
}

#[test]
fn cli_event_cooldown() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path();

    run_ok(home, &["keygen"]);
    let out = run_ok(home, &["event", "cooldown"]);
    assert!(out.contains("may create an event now"));

    run_ok(home, &["event", "create", "--name", "First"]);
    let out = run_ok(home, &["event", "cooldown"]);
    assert!(out.contains("must wait"), "got: {out}");

    let output = run(home, &["event", "create", "--name", "Second"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Rate limited"));
}

#[test]
fn cli_link_roundtrip_and_config() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path();
    std::fs::write(
        home.join("config.json"),
        r#"{"context_id": 8453, "event_cooldown_secs": 0}"#,
    )
    .unwrap();

    run_ok(home, &["keygen"]);
    run_ok(home, &["mint"]);
    run_ok(home, &["event", "create", "--name", "One"]);
    run_ok(home, &["event", "create", "--name", "Two"]);

    let link = run_ok(
        home,
        &["sign", "--event", "2", "--compact", "--link", "https://stamps.example"],
    );
    assert!(link.starts_with("https://stamps.example/claim/"));
    let out = run_ok(home, &["claim", link.trim()]);
    assert!(out.contains("event #2"), "got: {out}");

    let status = run_ok(home, &["status"]);
    assert!(status.contains("Context:    8453"));
}

#[test]
fn cli_ledger_lock_released_after_each_command() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path();
    run_ok(home, &["keygen", "alice"]);

    let output = stamp_binary()
        .env("RUST_LOG", "debug")
        .arg("--home")
        .arg(home)
        .args(["--as", "alice", "mint"])
        .output()
        .expect("failed to execute stamp");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("locked"), "stderr: {stderr}");
    assert!(stderr.contains("saved"), "stderr: {stderr}");

    assert!(home.join("ledger.json").exists());
    assert!(!home.join("ledger.lock").exists());
    // A second command gets the lock straight away and sees the first one's write.
    let out = run_ok(home, &["status"]);
    assert!(out.contains("Passports:  1"), "got: {out}");
}

#[cfg(unix)]
#[test]
fn cli_key_files_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let home = dir.path();
    run_ok(home, &["keygen", "alice"]);
    let mode = std::fs::metadata(home.join("keys").join("alice.key"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}
