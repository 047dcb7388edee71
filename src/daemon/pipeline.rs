//! One commit cycle: detect, diff, generate, stage, commit, push
//!
//! Each step short-circuits the rest on failure. Every step attempt is written
//! to the repository log under a per-cycle id; push outcomes also notify the
//! user. Whether a failure pauses the daemon is decided by the caller via
//! [`CycleError::pauses_loop`].

use super::logging::RepoLog;
use crate::backend::MessageSource;
use crate::constants::BACKEND_TIMEOUT;
use crate::error::{CycleError, GenerateError};
use crate::git::Repository;
use crate::models::{CycleReport, CycleStep};
use crate::monitor::ChangeMonitor;
use crate::notify::Notifier;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

pub struct CommitPipeline<R, M, N> {
    monitor: ChangeMonitor<R>,
    source: M,
    notifier: N,
    log: RepoLog,
    repo_name: String,
    generate_timeout: Duration,
}

impl<R, M, N> CommitPipeline<R, M, N>
where
    R: Repository,
    M: MessageSource,
    N: Notifier,
{
    pub fn new(
        monitor: ChangeMonitor<R>,
        source: M,
        notifier: N,
        log: RepoLog,
        repo_name: impl Into<String>,
    ) -> Self {
        Self {
            monitor,
            source,
            notifier,
            log,
            repo_name: repo_name.into(),
            generate_timeout: BACKEND_TIMEOUT,
        }
    }

    pub fn with_generate_timeout(mut self, timeout: Duration) -> Self {
        self.generate_timeout = timeout;
        self
    }

    /// Run one cycle to completion
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let cycle = Uuid::new_v4();

        let has_changes = self
            .monitor
            .has_changes()
            .map_err(|e| self.fail(cycle, CycleError::Detection(e)))?;
        if !has_changes {
            self.log
                .log_step(cycle, CycleStep::Detect, "No changes detected", json!({}));
            return Ok(CycleReport::NoChanges);
        }
        self.log
            .log_step(cycle, CycleStep::Detect, "Changes detected", json!({}));

        let diff = self
            .monitor
            .diff()
            .map_err(|e| self.fail(cycle, CycleError::Diff(e)))?;
        self.log.log_step(
            cycle,
            CycleStep::Diff,
            "Diff collected",
            json!({
                "bytes": diff.original_len,
                "truncated": diff.truncated,
            }),
        );

        let message = self
            .generate(&diff.text)
            .await
            .map_err(|e| self.fail(cycle, CycleError::Generation(e)))?;
        self.log.log_step(
            cycle,
            CycleStep::Generate,
            &format!("Generated commit message: {}", message),
            json!({ "message": message }),
        );

        let repo = self.monitor.repository();

        repo.add_all()
            .map_err(|e| self.fail(cycle, CycleError::Stage(e)))?;
        self.log
            .log_step(cycle, CycleStep::Stage, "Changes staged", json!({}));

        repo.commit(&message)
            .map_err(|e| self.fail(cycle, CycleError::Commit(e)))?;
        self.log.log_step(
            cycle,
            CycleStep::Commit,
            &format!("Committed: {}", message),
            json!({ "message": message }),
        );

        if let Err(e) = repo.push() {
            let err = self.fail(cycle, CycleError::Push(e));
            self.notifier.paused(&self.repo_name, &source_text(&err));
            return Err(err);
        }
        self.log
            .log_step(cycle, CycleStep::Push, "Pushed to remote", json!({}));
        self.notifier.committed(&self.repo_name, &message);

        Ok(CycleReport::Pushed { message })
    }

    async fn generate(&self, diff: &str) -> Result<String, GenerateError> {
        match tokio::time::timeout(self.generate_timeout, self.source.generate(diff)).await {
            Ok(result) => result,
            Err(_) => Err(GenerateError::Timeout(self.generate_timeout)),
        }
    }

    fn fail(&self, cycle: Uuid, err: CycleError) -> CycleError {
        self.log.log_step_error(cycle, err.step(), &err.to_string());
        err
    }
}

/// Underlying error text without the step prefix
fn source_text(err: &CycleError) -> String {
    std::error::Error::source(err)
        .map(|source| source.to_string())
        .unwrap_or_else(|| err.to_string())
}
