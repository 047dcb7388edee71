//! Error taxonomy
//!
//! Typed failures for each layer. Cycle errors carry the step that failed so the
//! daemon loop can tell transient failures from the one that pauses it (push).

use crate::backend::Provider;
use crate::models::CycleStep;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Persisted state could not be read, parsed or written
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },
    #[error("Failed to serialize {what}: {message}")]
    Serialize { what: &'static str, message: String },
}

/// Input rejected locally, before any network or process call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("API key is required")]
    MissingCredential,
    #[error("{provider} API key appears to be invalid (too short)")]
    CredentialTooShort { provider: Provider },
    #[error("{provider} API key should start with {expected}")]
    CredentialPrefix {
        provider: Provider,
        expected: &'static str,
    },
    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),
    #[error(
        "Invalid check interval: {0}. Must be between 1 and {} minutes",
        crate::constants::MAX_CHECK_INTERVAL_MINUTES
    )]
    InvalidInterval(i64),
    #[error("Invalid check interval '{0}': not a whole number of minutes")]
    UnparsableInterval(String),
    #[error("Invalid base URL '{0}': must start with http:// or https://")]
    InvalidBaseUrl(String),
}

/// A git subprocess failed; the error text is opaque
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
    #[error("failed to enter {}: {source}", .path.display())]
    Enter {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Commit message generation failed
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("API error (status {status}): {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("no response from {0} API")]
    Empty(Provider),
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerateError::Timeout(crate::constants::BACKEND_TIMEOUT)
        } else if err.is_decode() {
            GenerateError::Decode(err.to_string())
        } else {
            GenerateError::Request(err.to_string())
        }
    }
}

/// One commit pipeline step failed; the rest of the cycle was skipped
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Failed to check changes: {0}")]
    Detection(#[source] GitError),
    #[error("Failed to get diff: {0}")]
    Diff(#[source] GitError),
    #[error("Failed to generate commit message: {0}")]
    Generation(#[source] GenerateError),
    #[error("Failed to stage changes: {0}")]
    Stage(#[source] GitError),
    #[error("Failed to commit: {0}")]
    Commit(#[source] GitError),
    #[error("Failed to push: {0}")]
    Push(#[source] GitError),
}

impl CycleError {
    /// Step that produced this error
    pub fn step(&self) -> CycleStep {
        match self {
            CycleError::Detection(_) => CycleStep::Detect,
            CycleError::Diff(_) => CycleStep::Diff,
            CycleError::Generation(_) => CycleStep::Generate,
            CycleError::Stage(_) => CycleStep::Stage,
            CycleError::Commit(_) => CycleStep::Commit,
            CycleError::Push(_) => CycleStep::Push,
        }
    }

    /// Only push failures stop the timer; everything else is retried next tick
    pub fn pauses_loop(&self) -> bool {
        matches!(self, CycleError::Push(_))
    }
}

/// Failures reported to the command that invoked a control operation
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("{}", not_running_message(.stale_pid))]
    NotRunning { stale_pid: Option<u32> },
    #[error("daemon is already running for {} (PID: {pid})", .path.display())]
    AlreadyRunning { pid: u32, path: PathBuf },
    #[error("failed to start daemon: {context}: {source}")]
    Spawn {
        context: &'static str,
        source: std::io::Error,
    },
    #[error("failed to stop daemon (PID: {pid}): {message}")]
    Terminate { pid: u32, message: String },
    #[error("failed to detect Git root: {0}")]
    Root(#[source] GitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

fn not_running_message(stale_pid: &Option<u32>) -> String {
    match stale_pid {
        Some(pid) => format!(
            "no daemon is running (process {} not found, may have crashed; stale descriptor removed)",
            pid
        ),
        None => "no daemon is running".to_string(),
    }
}
