//! Integration tests for the wx-exporter CLI.
//!
//! These tests run the built binary and check its output and exit codes.

use std::path::Path;
use std::process::{Command, Output};

const ENV_VARS: &[&str] = &[
    "TARGET_GROUP",
    "WECHAT_WINDOW_CLASS",
    "MESSAGE_TIME_RANGE",
    "MESSAGE_START_TIME",
    "MESSAGE_END_TIME",
    "MAX_SCROLL_ATTEMPTS",
    "SCROLL_WAIT_TIME",
    "DEDUP_STRICTNESS",
    "EXPORT_PATH",
    "LOG_PATH",
];

/// Run the binary with a clean configuration environment.
fn run(args: &[&str], cwd: &Path) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_wx-exporter"));
    command.args(args).current_dir(cwd);
    for var in ENV_VARS {
        command.env_remove(var);
    }
    command.output().expect("Failed to execute wx-exporter")
}

/// Test that --help describes the subcommands and exits successfully.
#[test]
fn test_help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&["--help"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for expected in ["export", "dump-structure", "show-config", "--conversation"] {
        assert!(
            stdout.contains(expected),
            "help should mention '{}'. Got: {}",
            expected,
            stdout
        );
    }
}

/// Test that show-config prints the defaults as JSON.
#[test]
fn test_show_config_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&["show-config"], dir.path());

    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    assert_eq!(json["target"]["conversation"], "A旗舰船队");
    assert_eq!(json["window"]["hours"], 14);
    assert_eq!(json["pagination"]["max_attempts"], 50);
    assert_eq!(json["dedup"]["strictness"], "global");
}

/// Test the layering: file, then environment, then flags.
#[test]
fn test_show_config_layering() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("wx.toml");
    std::fs::write(
        &config_path,
        "[target]\nconversation = \"from file\"\n\n[pagination]\nmax_attempts = 7\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_wx-exporter"))
        .args(["show-config", "--config"])
        .arg(&config_path)
        .args(["--strictness", "adjacent"])
        .current_dir(dir.path())
        .env("MAX_SCROLL_ATTEMPTS", "9")
        .env_remove("TARGET_GROUP")
        .env_remove("DEDUP_STRICTNESS")
        .output()
        .expect("Failed to execute wx-exporter");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["target"]["conversation"], "from file");
    assert_eq!(json["pagination"]["max_attempts"], 9);
    assert_eq!(json["dedup"]["strictness"], "adjacent");
}

/// Test that invalid configuration exits with code 1 and a message on stderr.
#[test]
fn test_invalid_range_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        &["show-config", "--start", "2025-04-10 12:00", "--end", "2025-04-10 11:00"],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid configuration"), "Got: {}", stderr);
}

/// Test that a failed export exits non-zero and writes no transcript.
///
/// Without a WeChat window (or off Windows) the run cannot connect.
#[test]
fn test_failed_export_writes_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let exports = dir.path().join("exports");
    let logs = dir.path().join("logs");

    let output = Command::new(env!("CARGO_BIN_EXE_wx-exporter"))
        .arg("export")
        .arg("--export-dir")
        .arg(&exports)
        .arg("--log-dir")
        .arg(&logs)
        .current_dir(dir.path())
        .env("WECHAT_WINDOW_CLASS", "NoSuchWindowClassForTests")
        .output()
        .expect("Failed to execute wx-exporter");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let written = std::fs::read_dir(&exports)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(written, 0);
}

/// Test that a failed structure dump exits non-zero and saves no file.
#[test]
fn test_failed_dump_structure_writes_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let exports = dir.path().join("exports");

    let output = Command::new(env!("CARGO_BIN_EXE_wx-exporter"))
        .args(["dump-structure", "--scroll", "--export-dir"])
        .arg(&exports)
        .arg("--log-dir")
        .arg(dir.path().join("logs"))
        .current_dir(dir.path())
        .env("WECHAT_WINDOW_CLASS", "NoSuchWindowClassForTests")
        .output()
        .expect("Failed to execute wx-exporter");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let written = std::fs::read_dir(&exports)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(written, 0);
}
