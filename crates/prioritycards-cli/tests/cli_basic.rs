//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with `HOME` pointed at a temporary
//! directory so the real config is never touched. Nothing here needs a
//! backend or the OS keyring.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command with an isolated home and return (code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_prioritycards"))
        .args(args)
        .env("HOME", home)
        .env_remove("PRIORITYCARDS_ENV")
        .env_remove("PRIORITYCARDS_URL")
        .env_remove("PRIORITYCARDS_ANON_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_card_score_is_local() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &[
            "card",
            "score",
            "--reach",
            "100",
            "--impact",
            "2",
            "--confidence",
            "80",
            "--effort-months",
            "4",
        ],
    );
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "40.00");
}

#[test]
fn test_card_score_zero_effort() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &[
            "card",
            "score",
            "--reach",
            "100",
            "--impact",
            "3",
            "--confidence",
            "100",
            "--effort-months",
            "0",
        ],
    );
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "0.00");
}

#[test]
fn test_config_path_is_under_home() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().starts_with(home.path().to_str().unwrap()));
    assert!(stdout.trim().ends_with("config.toml"));
}

#[test]
fn test_config_defaults() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "backend.cards_table"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "cards");

    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "display.default_sort"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "created");
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();
    let (code, _, _) = run_cli(
        home.path(),
        &["config", "set", "backend.url", "https://example.supabase.co"],
    );
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "backend.url"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "https://example.supabase.co");
}

#[test]
fn test_config_rejects_bad_sort() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "display.default_sort", "title"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_unknown_key() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "nope.nothing"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_reset() {
    let home = TempDir::new().unwrap();
    run_cli(home.path(), &["config", "set", "display.default_sort", "score"]);
    let (code, _, _) = run_cli(home.path(), &["config", "reset"]);
    assert_eq!(code, 0);

    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "display.default_sort"]);
    assert_eq!(stdout.trim(), "created");
}

#[test]
fn test_config_list_is_json() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["auth"]["session_key"], "auth");
}

#[test]
fn test_login_without_backend_fails() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(
        home.path(),
        &["auth", "login", "--username", "alice", "--password", "hunter2"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("backend.url"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("prioritycards"));
}
