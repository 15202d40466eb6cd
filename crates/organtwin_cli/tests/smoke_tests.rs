//! CLI smoke tests: verify basic binary behavior.

use std::process::Command;

fn cli_bin(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_organtwin"));
    cmd.current_dir(dir)
        .env_remove("ORGANTWIN_SEED")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_help_flag() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli_bin(dir.path()).arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
    assert!(stdout.contains("--meals-per-day"));
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli_bin(dir.path()).arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("organtwin"), "Expected binary name in --version output");
}

#[test]
fn test_one_day_text_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli_bin(dir.path())
        .args(["--days", "1", "--meals-per-day", "2", "--seed", "3"])
        .output()
        .expect("failed to run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Day 1: overall health"));
    assert!(stdout.contains("heart"));
    assert!(stdout.contains("blood_pressure"));
    assert!(stdout.contains("Recommendation:"));
}

#[test]
fn test_json_report_and_snapshot_resume() {
    let dir = tempfile::tempdir().unwrap();
    let snap = dir.path().join("session.json");

    let first = cli_bin(dir.path())
        .args(["--meals-per-day", "2", "--json", "--snapshot-out"])
        .arg(&snap)
        .output()
        .expect("failed to run");
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));
    let report: serde_json::Value = serde_json::from_slice(&first.stdout).unwrap();
    assert_eq!(report["meals_simulated"], 2);
    assert_eq!(report["organs"].as_array().unwrap().len(), 10);
    assert!(snap.exists());

    let second = cli_bin(dir.path())
        .args(["--meals-per-day", "3", "--json", "--intervention", "sleep", "--snapshot-in"])
        .arg(&snap)
        .output()
        .expect("failed to run");
    assert!(second.status.success(), "{}", String::from_utf8_lossy(&second.stderr));
    let report: serde_json::Value = serde_json::from_slice(&second.stdout).unwrap();
    assert_eq!(report["meals_simulated"], 5);
}

#[test]
fn test_custom_meal_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli_bin(dir.path())
        .args(["--meals-per-day", "1", "--meal", r#"{"sodium": 4000, "sugar": 60}"#])
        .output()
        .expect("failed to run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn test_bad_input_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let bad_meal = cli_bin(dir.path())
        .args(["--meal", "not json"])
        .output()
        .expect("failed to run");
    assert!(!bad_meal.status.success());

    let bad_portion = cli_bin(dir.path())
        .args(["--portion", "0"])
        .output()
        .expect("failed to run");
    assert!(!bad_portion.status.success());

    let missing = cli_bin(dir.path())
        .args(["--snapshot-in", "does-not-exist.json"])
        .output()
        .expect("failed to run");
    assert!(!missing.status.success());
}

#[test]
fn test_missing_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli_bin(dir.path())
        .args(["--config", "/tmp/nonexistent_organtwin_config_12345.toml", "--meals-per-day", "1"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
}

#[test]
fn test_malformed_registry_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("broken.toml");
    // Organ entry without a weight.
    std::fs::write(&config, "[[registry.organs]]\nname = \"heart\"\nsensitivity = { sodium = 0.8 }\n")
        .unwrap();
    let output = cli_bin(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["--meals-per-day", "1", "--json"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.toml"), "{}", stderr);
}
