//! Version-control collaborator
//!
//! Every operation is an opaque `git` subprocess call. Failures surface as
//! [`GitError`] carrying git's stderr; nothing is parsed into structured
//! conflict types.

use crate::error::GitError;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Operations the commit pipeline needs from a working tree
pub trait Repository {
    /// Make `root` the working context for every later call
    fn enter(&mut self, root: &Path) -> Result<(), GitError>;
    /// Absolute repository root of the working context
    fn root(&self) -> Result<PathBuf, GitError>;
    /// Whether tracked changes or untracked files exist
    fn has_changes(&self) -> Result<bool, GitError>;
    /// Textual diff of uncommitted changes
    fn diff(&self) -> Result<String, GitError>;
    fn add_all(&self) -> Result<(), GitError>;
    fn commit(&self, message: &str) -> Result<(), GitError>;
    fn push(&self) -> Result<(), GitError>;
}

/// `Repository` backed by the `git` executable on `PATH`
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    workdir: Option<PathBuf>,
}

impl GitCli {
    /// Operate on the current directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Operate on `dir` without changing the process working directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(dir.into()),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(ref dir) = self.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<Output, GitError> {
        let label = args.first().copied().unwrap_or_default().to_string();
        log::debug!("git {}", args.join(" "));

        let output = self
            .command(args)
            .output()
            .map_err(|source| GitError::Spawn {
                command: label.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(output)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stderr = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            Err(GitError::Failed {
                command: label,
                stderr,
            })
        }
    }

    fn stdout(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn untracked_files(&self) -> Result<Vec<String>, GitError> {
        let listing = self.stdout(&["ls-files", "--others", "--exclude-standard"])?;
        Ok(listing
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.to_string())
            .collect())
    }
}

impl Repository for GitCli {
    fn enter(&mut self, root: &Path) -> Result<(), GitError> {
        std::env::set_current_dir(root).map_err(|source| GitError::Enter {
            path: root.to_path_buf(),
            source,
        })?;
        self.workdir = Some(root.to_path_buf());
        Ok(())
    }

    fn root(&self) -> Result<PathBuf, GitError> {
        let raw = self.stdout(&["rev-parse", "--show-toplevel"])?;
        let root = PathBuf::from(raw.trim());
        // Keep git's answer if canonicalization fails (e.g. permissions)
        Ok(root.canonicalize().unwrap_or(root))
    }

    fn has_changes(&self) -> Result<bool, GitError> {
        let status = self.stdout(&["status", "--porcelain"])?;
        Ok(!status.trim().is_empty())
    }

    fn diff(&self) -> Result<String, GitError> {
        let mut diff = self.stdout(&["diff"])?;

        let untracked = self.untracked_files()?;
        if !untracked.is_empty() {
            if !diff.is_empty() && !diff.ends_with('\n') {
                diff.push('\n');
            }
            diff.push_str("Untracked files:\n");
            for file in untracked {
                diff.push_str("  ");
                diff.push_str(&file);
                diff.push('\n');
            }
        }
        Ok(diff)
    }

    fn add_all(&self) -> Result<(), GitError> {
        self.run(&["add", "."]).map(|_| ())
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message]).map(|_| ())
    }

    fn push(&self) -> Result<(), GitError> {
        self.run(&["push"]).map(|_| ())
    }
}

/// Repository name used for log files and notifications: the root's base name
pub fn repo_name(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "repository".to_string())
}
