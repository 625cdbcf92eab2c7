//! Integration tests for the command-line interface.

use assert_cmd::cargo::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn vespa_guard(config_dir: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("vespa-guard"));
    cmd.env("VESPA_GUARD_CONFIG", config_dir.path().join("config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_simulate_disarmed_hover_never_fires() {
    let dir = TempDir::new().unwrap();
    vespa_guard(&dir)
        .args(["--quiet", "simulate", "--scenario", "hover", "--frames", "20"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"High-confidence:\s+9 frames").unwrap())
        .stdout(predicate::str::is_match(r"Activations:\s+0\n").unwrap())
        .stdout(predicate::str::contains("Final gate state:    disarmed"));
}

#[test]
fn test_simulate_armed_hover_fires_once() {
    let dir = TempDir::new().unwrap();
    vespa_guard(&dir)
        .args(["--quiet", "simulate", "--arm", "--frames", "20"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Activations:\s+1\n").unwrap())
        .stdout(predicate::str::is_match(r"Actuator on:\s+9 frames").unwrap());
}

#[test]
fn test_simulate_transit_never_fires_without_pulse() {
    let dir = TempDir::new().unwrap();
    vespa_guard(&dir)
        .args(["--quiet", "simulate", "--arm", "-s", "flyby", "-n", "6"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Medium-confidence:\s+5 frames").unwrap())
        .stdout(predicate::str::is_match(r"Activations:\s+0\n").unwrap());
}

#[test]
fn test_simulate_brownout_latches() {
    let dir = TempDir::new().unwrap();
    vespa_guard(&dir)
        .args([
            "--quiet",
            "simulate",
            "--arm",
            "--voltage-mv",
            "4200",
            "--frames",
            "20",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Final gate state:    safe-mode-brownout"))
        .stdout(predicate::str::is_match(r"Activations:\s+0\n").unwrap());
}

#[test]
fn test_simulate_writes_csv_events() {
    let dir = TempDir::new().unwrap();
    let events = dir.path().join("events.csv");
    vespa_guard(&dir)
        .args(["--quiet", "simulate", "--arm", "--frames", "15", "--events"])
        .arg(&events)
        .assert()
        .success();

    let text = std::fs::read_to_string(&events).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("recorded_at,sequence,frame_ms"));
    assert_eq!(lines.clone().count(), 14);
    assert!(text.contains(",high,"));
    assert!(text.contains("approved:2000"));
}

#[test]
fn test_simulate_writes_json_events() {
    let dir = TempDir::new().unwrap();
    let events = dir.path().join("events.jsonl");
    vespa_guard(&dir)
        .args(["--quiet", "simulate", "--frames", "5", "--format", "json", "--events"])
        .arg(&events)
        .assert()
        .success();

    let text = std::fs::read_to_string(&events).unwrap();
    assert_eq!(text.lines().count(), 4);
    for line in text.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value["host"].is_string());
        assert_eq!(value["gate_state"], "disarmed");
    }
}

#[test]
fn test_simulate_rejects_unknown_scenario() {
    let dir = TempDir::new().unwrap();
    vespa_guard(&dir)
        .args(["simulate", "--scenario", "orbit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown scenario"));
}

#[test]
fn test_config_init_check_and_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    vespa_guard(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    vespa_guard(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(path.exists());

    vespa_guard(&dir)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"));

    vespa_guard(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[safety]"));
}

#[test]
fn test_config_check_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[tracker]\nhistory_length = 500\n",
    )
    .unwrap();

    vespa_guard(&dir)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("history_length"));
}
