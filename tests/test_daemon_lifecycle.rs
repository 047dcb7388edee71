//! End-to-end daemon lifecycle: init spawns a real detached daemon, status and
//! pause observe and stop it, and an out-of-band kill is reported as a crash.
//!
//! The backend points at a closed local port, so cycles fail at generation and
//! nothing is ever committed or pushed.

mod helpers;

use helpers::{git_available, process_alive, wait_until, TestEnvironment};
use predicates::prelude::*;
use std::fs;
use std::time::Duration;

const UNREACHABLE_BACKEND: &str = "provider = \"openai\"\n\
api_key = \"sk-test-lifecycle\"\n\
base_url = \"http://127.0.0.1:9\"\n\
check_interval_minutes = 60\n";

fn started_env() -> Option<(TestEnvironment, std::path::PathBuf, u32)> {
    if !git_available() {
        eprintln!("git not available, skipping");
        return None;
    }
    let env = TestEnvironment::new().unwrap();
    env.write_config(UNREACHABLE_BACKEND).unwrap();
    let repo = env.git_repo("website").unwrap();

    env.autogit()
        .arg("init")
        .current_dir(&repo)
        .assert()
        .success()
        .stdout(predicate::str::contains("autogit daemon started"));

    let descriptor = env.read_descriptor().expect("descriptor written after spawn");
    let pid = descriptor["pid"].as_u64().unwrap() as u32;
    assert_eq!(descriptor["status"], "running");
    assert_eq!(descriptor["repo_path"], repo.display().to_string());

    Some((env, repo, pid))
}

#[test]
fn test_init_status_pause_cycle() {
    let Some((env, _repo, pid)) = started_env() else {
        return;
    };
    let log_path = env.config_dir().join("logs").join("website.log");

    assert!(wait_until(Duration::from_secs(10), || {
        fs::read_to_string(&log_path)
            .map(|log| log.contains("Daemon started"))
            .unwrap_or(false)
    }));

    env.autogit()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon is running"))
        .stdout(predicate::str::contains(format!("PID: {}", pid)));

    env.autogit()
        .arg("pause")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon stopped"));

    assert!(env.read_descriptor().is_none());
    assert!(wait_until(Duration::from_secs(10), || !process_alive(pid)));

    // Graceful stop is recorded by the daemon itself
    assert!(wait_until(Duration::from_secs(10), || {
        fs::read_to_string(&log_path)
            .map(|log| log.contains("Daemon shutting down"))
            .unwrap_or(false)
    }));

    env.autogit()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon is not running"));
}

#[test]
fn test_second_init_refused_while_running() {
    let Some((env, repo, pid)) = started_env() else {
        return;
    };

    env.autogit()
        .arg("init")
        .current_dir(&repo)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already running"));

    env.autogit().arg("pause").assert().success();
    assert!(wait_until(Duration::from_secs(10), || !process_alive(pid)));
}

#[test]
fn test_killed_daemon_reported_as_crashed() {
    let Some((env, _repo, pid)) = started_env() else {
        return;
    };

    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGKILL);
    }
    assert!(wait_until(Duration::from_secs(10), || !process_alive(pid)));

    env.autogit()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon crashed"));
    assert!(env.read_descriptor().is_some(), "stale descriptor survives status");

    env.autogit()
        .arg("pause")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    assert!(env.read_descriptor().is_none());
}

#[test]
fn test_init_outside_repository_fails() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let env = TestEnvironment::new().unwrap();
    env.write_config(UNREACHABLE_BACKEND).unwrap();
    let outside = env.path().join("plain");
    fs::create_dir_all(&outside).unwrap();

    env.autogit()
        .arg("init")
        .current_dir(&outside)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to detect Git root"));

    assert!(env.read_descriptor().is_none());
}

#[test]
fn test_init_rejects_invalid_credential() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let env = TestEnvironment::new().unwrap();
    env.write_config("provider = \"gemini\"\napi_key = \"short\"\n").unwrap();
    let repo = env.git_repo("website").unwrap();

    env.autogit()
        .arg("init")
        .current_dir(&repo)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Gemini API key appears to be invalid"));

    assert!(env.read_descriptor().is_none());
}

#[test]
fn test_relative_config_dir_is_shared_with_daemon() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let env = TestEnvironment::new().unwrap();
    let repo = env.git_repo("website").unwrap();
    let subdir = repo.join("src");
    fs::create_dir_all(&subdir).unwrap();

    // <tmp>/website/src/../../state is <tmp>/state
    let state = env.path().join("state");
    fs::create_dir_all(&state).unwrap();
    fs::write(state.join("config.toml"), UNREACHABLE_BACKEND).unwrap();

    env.autogit_unbound()
        .args(["--config-dir", "../../state", "init"])
        .current_dir(&subdir)
        .assert()
        .success();

    let raw = fs::read_to_string(state.join("daemon.json")).expect("descriptor in the caller's config dir");
    let descriptor: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let pid = descriptor["pid"].as_u64().unwrap() as u32;

    let log_path = state.join("logs").join("website.log");
    assert!(
        wait_until(Duration::from_secs(10), || log_path.exists()),
        "daemon logs into the caller's config dir"
    );

    env.autogit_unbound()
        .args(["--config-dir", state.to_str().unwrap(), "pause"])
        .assert()
        .success();
    assert!(wait_until(Duration::from_secs(10), || !process_alive(pid)));
    assert!(wait_until(Duration::from_secs(10), || {
        fs::read_to_string(&log_path)
            .map(|log| log.contains("Daemon shutting down"))
            .unwrap_or(false)
    }));
}
