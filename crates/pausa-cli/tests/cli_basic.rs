//! Basic CLI E2E tests.
//!
//! Commands run via cargo with HOME pointed at a per-test temp directory,
//! so each test gets its own state, history and config files.

use std::path::Path;
use std::process::Command;

/// Run a CLI command against an isolated home directory.
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "pausa-cli", "--quiet", "--"])
        .args(args)
        .env("HOME", home)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn status_when_idle() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["status"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Status:        idle"));
}

#[test]
fn status_json_has_expected_fields() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["status", "--json"]);
    assert_eq!(code, 0);

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["status"], "idle");
    assert_eq!(parsed["progress"], 0.0);
    assert!(parsed.get("remaining_secs").is_some());
}

#[test]
fn pause_without_a_session_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["pause"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("timer not running"));
}

#[test]
fn stop_without_a_session_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["stop"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("timer not running"));
}

#[test]
fn empty_history_lists_nothing() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["history"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No session history."));
}

#[test]
fn completed_session_shows_up_in_history() {
    let home = tempfile::tempdir().unwrap();

    // A one-second break runs to completion and exits on its own.
    let (_, _, code) = run_cli(home.path(), &["break", "1s"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_cli(home.path(), &["history", "--json"]);
    assert_eq!(code, 0);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["session_type"], "break");
    assert_eq!(records[0]["completed"], true);
}

#[test]
fn invalid_duration_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["start", "soon"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unable to parse duration"));
}

#[test]
fn plugin_list_with_empty_directory() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["plugin", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No plugins found"));
}

#[test]
fn plugin_list_shows_loaded_scripts() {
    let home = tempfile::tempdir().unwrap();
    let plugins_dir = home.path().join(".config/pausa/plugins");
    std::fs::create_dir_all(&plugins_dir).unwrap();
    std::fs::write(
        plugins_dir.join("greeter.lua"),
        r#"
pausa.register_plugin({
    name = "greeter",
    version = "1.2.0",
    description = "Says hello",
    author = "tests",
})
pausa.register_hook("timer_started", function(event) end)
"#,
    )
    .unwrap();

    let (stdout, _, code) = run_cli(home.path(), &["plugin", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("greeter"));
    assert!(stdout.contains("1.2.0"));
}

#[test]
fn config_show_prints_defaults() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "show"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("work_minutes = 25"));
    assert!(stdout.contains("[plugins]"));
}

#[test]
fn config_path_points_into_home() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("config.toml"));
}

#[test]
fn completions_generate_for_bash() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("pausa"));
}
