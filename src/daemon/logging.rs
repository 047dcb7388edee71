//! Per-repository append-only log
//!
//! Every record is one line:
//! `[<rfc3339>] <LEVEL> <message> | <json>`, where the JSON carries the event
//! name, the cycle id (for pipeline steps) and a timestamp. This file is the
//! daemon's only audit trail and the data source for `autogit logs`.

use crate::constants::{
    APP_NAME, EVENT_CYCLE_STEP, EVENT_DAEMON_SHUTDOWN, EVENT_DAEMON_STARTUP, EVENT_STATE_CHANGE,
};
use crate::models::{CycleStep, LoopState};
use anyhow::{Context, Result};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::json;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Append-only log file for one monitored repository
#[derive(Debug, Clone)]
pub struct RepoLog {
    path: PathBuf,
    file: Arc<Mutex<Option<File>>>,
}

impl RepoLog {
    /// Open (creating if needed) the log file at `path` for appending
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(Some(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Route `log` facade records from this crate into the same file.
    ///
    /// Only one logger can be installed per process; a second call fails.
    pub fn install_bridge(&self) -> Result<()> {
        log::set_boxed_logger(Box::new(LogBridge { log: self.clone() }))
            .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;
        log::set_max_level(LevelFilter::Info);
        Ok(())
    }

    /// Log daemon startup
    pub fn log_startup(&self, pid: u32, root: &Path, interval: Duration) {
        let data = json!({
            "event": EVENT_DAEMON_STARTUP,
            "pid": pid,
            "root": root.display().to_string(),
            "interval_secs": interval.as_secs(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.write_record(
            Level::Info,
            &format!("Daemon started for {}", root.display()),
            &data,
        );
    }

    /// Log daemon shutdown
    pub fn log_shutdown(&self, reason: &str) {
        let data = json!({
            "event": EVENT_DAEMON_SHUTDOWN,
            "reason": reason,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.write_record(Level::Info, "Daemon shutting down", &data);
    }

    /// Log a successful (or no-op) pipeline step
    pub fn log_step(&self, cycle: Uuid, step: CycleStep, message: &str, detail: serde_json::Value) {
        let data = json!({
            "event": EVENT_CYCLE_STEP,
            "cycle": cycle.to_string(),
            "step": step,
            "outcome": "ok",
            "detail": detail,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.write_record(Level::Info, message, &data);
    }

    /// Log a failed pipeline step
    pub fn log_step_error(&self, cycle: Uuid, step: CycleStep, error: &str) {
        let data = json!({
            "event": EVENT_CYCLE_STEP,
            "cycle": cycle.to_string(),
            "step": step,
            "outcome": "failed",
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.write_record(Level::Error, error, &data);
    }

    /// Log a loop state transition
    pub fn log_state_change(&self, from: LoopState, to: LoopState) {
        let data = json!({
            "event": EVENT_STATE_CHANGE,
            "from": format!("{:?}", from),
            "to": format!("{:?}", to),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.write_record(
            Level::Info,
            &format!("State changed: {:?} -> {:?}", from, to),
            &data,
        );
    }

    /// Log an error outside a pipeline cycle
    pub fn log_error(&self, error_message: &str, context: Option<&str>) {
        let data = json!({
            "event": "error",
            "message": error_message,
            "context": context,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.write_record(Level::Error, error_message, &data);
    }

    /// Release the file handle; later records are dropped
    pub fn close(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(mut file) = guard.take() {
                let _ = file.flush();
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.file.lock().map(|guard| guard.is_none()).unwrap_or(true)
    }

    fn write_record(&self, level: Level, message: &str, data: &serde_json::Value) {
        let line = format_record(level, message, data);
        // A failed write has nowhere else to go; the daemon has no terminal
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.write_all(line.as_bytes());
            }
        }
    }
}

fn format_record(level: Level, message: &str, data: &serde_json::Value) -> String {
    // Keep one record per line even when git stderr spans several
    let message = message.replace('\n', " ");
    format!(
        "[{}] {} {} | {}\n",
        chrono::Local::now().to_rfc3339(),
        level,
        message,
        data
    )
}

/// `log::Log` implementation writing into a [`RepoLog`]
struct LogBridge {
    log: RepoLog,
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info && metadata.target().starts_with(APP_NAME)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let data = json!({
            "event": "log",
            "target": record.target(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.log
            .write_record(record.level(), &record.args().to_string(), &data);
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.log.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}
