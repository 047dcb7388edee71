//! Data models module
//!
//! Defines core data structures:
//! - DaemonDescriptor: persisted record of a spawned daemon
//! - DaemonStatus: last-known status written into the descriptor
//! - LoopState: in-memory state of a running daemon loop
//! - DaemonReport: what a control process observes about a daemon
//! - CycleStep / CycleReport: outcome of one commit pipeline cycle

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Last-known daemon status as recorded in the descriptor.
///
/// The enumeration is `running`, `paused` and `error`. A deliberately paused
/// daemon normally has no descriptor at all, so `paused` is rarely written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonStatus {
    Running,
    Paused,
    Error,
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DaemonStatus::Running => "running",
            DaemonStatus::Paused => "paused",
            DaemonStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Persisted record of a spawned daemon (`daemon.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonDescriptor {
    /// Process id of the daemon child
    pub pid: u32,
    /// Absolute git root the daemon monitors
    pub repo_path: PathBuf,
    /// Last status the daemon (or its spawner) recorded
    pub status: DaemonStatus,
}

impl DaemonDescriptor {
    /// Descriptor for a freshly spawned daemon
    pub fn running(pid: u32, repo_path: PathBuf) -> Self {
        Self {
            pid,
            repo_path,
            status: DaemonStatus::Running,
        }
    }
}

/// In-memory state of the daemon loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    PausedOnError,
    Stopped,
}

impl LoopState {
    /// Status to record in the descriptor for this state, if any
    pub fn descriptor_status(self) -> Option<DaemonStatus> {
        match self {
            LoopState::Running => Some(DaemonStatus::Running),
            LoopState::PausedOnError => Some(DaemonStatus::Error),
            LoopState::Stopped => None,
        }
    }
}

/// Result of inspecting the daemon descriptor from a control process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonReport {
    /// No descriptor present
    NotRunning,
    /// Descriptor present but its process is gone
    Crashed(DaemonDescriptor),
    /// Descriptor present and its process is alive
    Alive(DaemonDescriptor),
}

/// Steps of one commit pipeline cycle, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStep {
    Detect,
    Diff,
    Generate,
    Stage,
    Commit,
    Push,
}

impl fmt::Display for CycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleStep::Detect => "detect",
            CycleStep::Diff => "diff",
            CycleStep::Generate => "generate",
            CycleStep::Stage => "stage",
            CycleStep::Commit => "commit",
            CycleStep::Push => "push",
        };
        f.write_str(s)
    }
}

/// Successful outcome of a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// Working tree was clean; nothing staged, committed or pushed
    NoChanges,
    /// Changes were committed with `message` and pushed
    Pushed { message: String },
}
