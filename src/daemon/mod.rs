//! Daemon process: scheduling loop, commit pipeline and process supervision
//!
//! The daemon runs as a detached child of `autogit init`:
//! - [`DaemonLoop`] runs one [`CommitPipeline`] cycle immediately, then one per
//!   interval, until a stop signal arrives
//! - A push failure moves the loop to `PausedOnError`; it then idles until stopped.
//!   So does a daemon that cannot enter its repository, before its first tick
//! - The only cross-process state is the descriptor in the [`StateStore`],
//!   which the loop updates at transitions and removes on graceful exit

pub mod logging;
pub mod pipeline;
pub mod supervisor;

pub use logging::RepoLog;
pub use pipeline::CommitPipeline;
pub use supervisor::{ProcessSupervisor, Supervisor};

use crate::backend::{Backend, MessageSource};
use crate::git::{repo_name, GitCli, Repository};
use crate::models::LoopState;
use crate::monitor::ChangeMonitor;
use crate::notify::{DesktopNotifier, Notifier};
use crate::store::StateStore;
use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Timer-driven state machine around a [`CommitPipeline`]
pub struct DaemonLoop<R, M, N> {
    pipeline: CommitPipeline<R, M, N>,
    store: StateStore,
    log: RepoLog,
    pid: u32,
    poll_interval: Duration,
    state: LoopState,
    start_paused: bool,
    cycles: u64,
}

impl<R, M, N> DaemonLoop<R, M, N>
where
    R: Repository,
    M: MessageSource,
    N: Notifier,
{
    pub fn new(
        pipeline: CommitPipeline<R, M, N>,
        store: StateStore,
        log: RepoLog,
        poll_interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            store,
            log,
            pid: std::process::id(),
            poll_interval,
            state: LoopState::Running,
            start_paused: false,
            cycles: 0,
        }
    }

    /// Use `pid` as this loop's identity in the descriptor
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Enter `PausedOnError` as soon as the loop runs, without ever ticking
    pub fn paused_on_error(mut self) -> Self {
        self.start_paused = true;
        self
    }

    /// Drive the loop until `shutdown` resolves; returns the number of cycles run.
    ///
    /// `shutdown` yields the reason recorded in the log. It is only polled
    /// between cycles, so a cycle that has started always runs to completion.
    pub async fn run<S>(mut self, shutdown: S) -> u64
    where
        S: Future<Output = String>,
    {
        tokio::pin!(shutdown);
        if self.start_paused {
            self.transition(LoopState::PausedOnError);
        }

        let mut ticker = interval(self.poll_interval);
        // A cycle that overruns the interval swallows the missed ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let reason = loop {
            match self.state {
                LoopState::Running => {
                    tokio::select! {
                        biased;
                        reason = &mut shutdown => break reason,
                        _ = ticker.tick() => self.tick().await,
                    }
                }
                LoopState::PausedOnError => break (&mut shutdown).await,
                LoopState::Stopped => break "stopped".to_string(),
            }
        };

        self.stop(&reason);
        self.cycles
    }

    async fn tick(&mut self) {
        self.cycles += 1;
        match self.pipeline.run_cycle().await {
            Ok(_) => self.transition(LoopState::Running),
            Err(e) if e.pauses_loop() => self.transition(LoopState::PausedOnError),
            // Logged by the pipeline; retried next tick
            Err(_) => {}
        }
    }

    fn transition(&mut self, next: LoopState) {
        let previous = self.state;
        if previous != next {
            self.log.log_state_change(previous, next);
            self.state = next;
        }

        if let Some(status) = next.descriptor_status() {
            match self.store.update_descriptor_status(self.pid, status) {
                Ok(true) => {}
                Ok(false) => log::debug!("Descriptor not owned by {}; status not recorded", self.pid),
                Err(e) => self
                    .log
                    .log_error(&e.to_string(), Some("updating daemon descriptor")),
            }
        }
    }

    fn stop(&mut self, reason: &str) {
        self.transition(LoopState::Stopped);
        self.log.log_shutdown(reason);

        if let Err(e) = self.store.delete_descriptor_if_owned(self.pid) {
            self.log
                .log_error(&e.to_string(), Some("removing daemon descriptor"));
        }
        self.log.close();
    }
}

/// Entry point of the spawned child: `autogit start-daemon <ROOT>`
pub async fn run_daemon_process(store: StateStore, root: PathBuf) -> Result<()> {
    let mut repo = GitCli::new();
    let entry = repo.enter(&root).and_then(|_| repo.root());
    let root = match entry {
        Ok(ref detected) => detected.clone(),
        Err(_) => root,
    };
    let name = repo_name(&root);

    store
        .ensure_directories()
        .context("Failed to create configuration directory")?;
    let log = RepoLog::open(store.log_path(&name))?;
    if let Err(e) = log.install_bridge() {
        log.log_error(&e.to_string(), Some("installing logger"));
    }

    let config = store.load_effective_config()?;
    let poll_interval = config.poll_interval();
    let pid = std::process::id();

    let backend = match Backend::from_config(&config) {
        Ok(backend) => backend,
        Err(e) => {
            log.log_error(&format!("{:#}", e), Some("creating backend"));
            log.log_shutdown("backend unavailable");
            log.close();
            return Err(e);
        }
    };

    log.log_startup(pid, &root, poll_interval);
    log::info!("Using {} backend", backend.provider());

    let pipeline = CommitPipeline::new(
        ChangeMonitor::new(repo),
        backend,
        DesktopNotifier,
        log.clone(),
        name,
    );
    let mut daemon = DaemonLoop::new(pipeline, store, log.clone(), poll_interval).with_pid(pid);
    if let Err(e) = entry {
        log.log_error(&e.to_string(), Some("entering repository"));
        daemon = daemon.paused_on_error();
    }
    daemon.run(shutdown_signal()).await;

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM with the reason to log
async fn shutdown_signal() -> String {
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = interrupt => "Received interrupt signal".to_string(),
                    _ = terminate.recv() => "Received terminate signal".to_string(),
                }
            }
            Err(_) => {
                interrupt.await;
                "Received interrupt signal".to_string()
            }
        }
    }

    #[cfg(not(unix))]
    {
        interrupt.await;
        "Received interrupt signal".to_string()
    }
}
