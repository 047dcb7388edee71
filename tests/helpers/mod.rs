#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Isolated configuration directory plus an optional Git repository
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.path().join("config")
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.config_dir().join("daemon.json")
    }

    /// Write `config.toml` with the given body
    pub fn write_config(&self, body: &str) -> anyhow::Result<()> {
        fs::create_dir_all(self.config_dir())?;
        fs::write(self.config_dir().join("config.toml"), body)?;
        Ok(())
    }

    /// Write `daemon.json` naming `pid`
    pub fn write_descriptor(&self, pid: u32, repo: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(self.config_dir())?;
        let json = serde_json::json!({
            "pid": pid,
            "repo_path": repo,
            "status": "running",
        });
        fs::write(self.descriptor_path(), serde_json::to_string_pretty(&json)?)?;
        Ok(())
    }

    pub fn read_descriptor(&self) -> Option<serde_json::Value> {
        let raw = fs::read_to_string(self.descriptor_path()).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Create `<tmp>/<name>` as a Git repository with one commit
    pub fn git_repo(&self, name: &str) -> anyhow::Result<PathBuf> {
        let repo = self.path().join(name);
        fs::create_dir_all(&repo)?;
        git(&repo, &["init", "-q"])?;
        git(&repo, &["config", "user.email", "dev@example.com"])?;
        git(&repo, &["config", "user.name", "Dev"])?;
        git(&repo, &["config", "commit.gpgsign", "false"])?;
        fs::write(repo.join("README.md"), "# test\n")?;
        git(&repo, &["add", "."])?;
        git(&repo, &["commit", "-q", "-m", "chore: initial"])?;
        Ok(repo.canonicalize()?)
    }

    /// Command for the autogit binary bound to this environment's config dir
    pub fn autogit(&self) -> assert_cmd::Command {
        let mut cmd = self.autogit_unbound();
        cmd.arg("--config-dir").arg(self.config_dir());
        cmd
    }

    /// Command for the autogit binary with no config dir and a clean environment
    pub fn autogit_unbound(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo_bin_cmd!("autogit");
        for var in [
            "AUTOGIT_CONFIG_DIR",
            "AUTOGIT_PROVIDER",
            "AUTOGIT_API_KEY",
            "AUTOGIT_BASE_URL",
            "AUTOGIT_CHECK_INTERVAL_MINUTES",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }
}

pub fn git(dir: &Path, args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new("git").args(args).current_dir(dir).status()?;
    anyhow::ensure!(status.success(), "git {:?} failed", args);
    Ok(())
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Whether `pid` exists and is not a zombie
pub fn process_alive(pid: u32) -> bool {
    let stat = match fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat,
        // No procfs: fall back to signal 0
        Err(_) => return unsafe { libc::kill(pid as libc::pid_t, 0) == 0 },
    };
    // State follows the parenthesised command name
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .map(|state| state != "Z" && state != "X")
        .unwrap_or(false)
}

/// Poll `condition` every 50ms until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    condition()
}
