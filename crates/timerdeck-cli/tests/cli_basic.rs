//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary home
//! directory so state never leaks between tests.

use std::process::{Command, Stdio};

use serde_json::Value;
use tempfile::TempDir;

struct Cli {
    home: TempDir,
}

impl Cli {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("tempdir"),
        }
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(env!("CARGO_BIN_EXE_timerdeck"))
            .args(args)
            .env("HOME", self.home.path())
            .env_remove("TIMERDECK_ENV")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .output()
            .expect("Failed to execute CLI command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        (stdout, stderr, code)
    }

    fn json(&self, args: &[&str]) -> Value {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "{args:?} failed: {stderr}");
        serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON from {args:?}: {e}\n{stdout}"))
    }

    fn add(&self, name: &str, duration: &str, category: &str) -> String {
        let timer = self.json(&["timer", "add", name, "-d", duration, "-c", category]);
        timer["id"].as_str().expect("id").to_string()
    }
}

#[test]
fn test_timer_add_and_list() {
    let cli = Cli::new();
    let id = cli.add("Focus", "25m", "Work");

    let timers = cli.json(&["timer", "list", "--json"]);
    let timers = timers.as_array().expect("array");
    assert_eq!(timers.len(), 1);
    assert_eq!(timers[0]["id"], id.as_str());
    assert_eq!(timers[0]["duration"], 1500);
    assert_eq!(timers[0]["remainingTime"], 1500);
    assert_eq!(timers[0]["status"], "Paused");
    assert_eq!(timers[0]["halfwayAlertEnabled"], false);
}

#[test]
fn test_timer_list_empty() {
    let cli = Cli::new();
    let (stdout, _, code) = cli.run(&["timer", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No timers yet."));
}

#[test]
fn test_timer_start_by_prefix() {
    let cli = Cli::new();
    let id = cli.add("Tea", "3m", "Home");

    let timer = cli.json(&["timer", "start", &id[..8]]);
    assert_eq!(timer["status"], "Running");

    let timer = cli.json(&["timer", "pause", &id]);
    assert_eq!(timer["status"], "Paused");
}

#[test]
fn test_timer_complete_does_not_log() {
    let cli = Cli::new();
    let id = cli.add("Tea", "3m", "Home");

    let timer = cli.json(&["timer", "complete", &id]);
    assert_eq!(timer["status"], "Completed");
    assert_eq!(timer["remainingTime"], 0);

    let logs = cli.json(&["history", "--json"]);
    assert!(logs.as_array().expect("array").is_empty());
}

#[test]
fn test_timer_add_rejects_invalid_input() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["timer", "add", "   ", "-d", "60"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error"));

    let (_, _, code) = cli.run(&["timer", "add", "Zero", "-d", "0"]);
    assert_ne!(code, 0);

    let timers = cli.json(&["timer", "list", "--json"]);
    assert!(timers.as_array().expect("array").is_empty());
}

#[test]
fn test_unknown_timer_id_fails() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["timer", "start", "nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no timer matches"));
}

#[test]
fn test_category_actions_are_selective() {
    let cli = Cli::new();
    let work = cli.add("Focus", "25m", "Work");
    let home = cli.add("Tea", "3m", "Home");

    let (_, stderr, code) = cli.run(&["category", "start", "Work"]);
    assert_eq!(code, 0, "{stderr}");

    let timers = cli.json(&["timer", "list", "--json"]);
    let status_of = |id: &str| {
        timers
            .as_array()
            .expect("array")
            .iter()
            .find(|t| t["id"] == id)
            .map(|t| t["status"].clone())
            .expect("timer present")
    };
    assert_eq!(status_of(&work), "Running");
    assert_eq!(status_of(&home), "Paused");

    let groups = cli.json(&["category", "list", "--json"]);
    let names: Vec<&str> = groups
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|g| g["category"].as_str())
        .collect();
    assert_eq!(names, ["Work", "Home"]);

    let (stdout, _, code) = cli.run(&["category", "list", "--names"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), ["Work", "Home"]);
}

#[test]
fn test_history_empty() {
    let cli = Cli::new();
    let (stdout, _, code) = cli.run(&["history"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No completed timers yet."));
}

#[test]
fn test_export_shape() {
    let cli = Cli::new();
    cli.add("Focus", "25m", "Work");

    let snapshot = cli.json(&["export"]);
    assert_eq!(snapshot["timers"].as_array().expect("timers").len(), 1);
    assert!(snapshot["logs"].as_array().expect("logs").is_empty());
    assert!(snapshot["exportedAt"].as_str().is_some());
}

#[test]
fn test_export_to_file() {
    let cli = Cli::new();
    let out = cli.home.path().join("dump.json");
    let (_, stderr, code) = cli.run(&["export", "-o", out.to_str().expect("utf-8 path")]);
    assert_eq!(code, 0, "{stderr}");

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).expect("written")).expect("json");
    assert!(written["timers"].as_array().expect("timers").is_empty());
}

#[test]
fn test_config_set_and_get() {
    let cli = Cli::new();
    let (stdout, _, code) = cli.run(&["config", "get", "defaults.category"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "General");

    let (_, _, code) = cli.run(&["config", "set", "defaults.category", "Kitchen"]);
    assert_eq!(code, 0);

    let timer = cli.json(&["timer", "add", "Eggs", "-d", "7m"]);
    assert_eq!(timer["category"], "Kitchen");
}

#[test]
fn test_config_rejects_unknown_key() {
    let cli = Cli::new();
    let (_, _, code) = cli.run(&["config", "set", "nonsense.key", "1"]);
    assert_eq!(code, 1);
    let (_, _, code) = cli.run(&["config", "set", "tick.interval_ms", "0"]);
    assert_eq!(code, 1);
}

#[test]
fn test_run_until_idle_completes_and_logs() {
    let cli = Cli::new();
    let (_, _, code) = cli.run(&["config", "set", "tick.interval_ms", "20"]);
    assert_eq!(code, 0);

    let id = cli.add("Short", "2", "Work");
    cli.json(&["timer", "start", &id]);

    let (stdout, stderr, code) = cli.run(&["run", "--until-idle"]);
    assert_eq!(code, 0, "{stderr}");
    let events: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("event line"))
        .collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "TimerCompleted");

    let timer = cli.json(&["timer", "show", &id]);
    assert_eq!(timer["status"], "Completed");
    let logs = cli.json(&["history", "--json"]);
    assert_eq!(logs.as_array().expect("array").len(), 1);
}

#[test]
fn test_run_help_warns_about_concurrent_writers() {
    let cli = Cli::new();
    let (stdout, _, code) = cli.run(&["run", "--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("last writer wins"), "{stdout}");
    assert!(stdout.contains("--until-idle"));
}
