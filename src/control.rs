//! Control surface
//!
//! Operations other processes use to start, inspect, stop and reconfigure a
//! daemon they share no memory with. Every operation re-reads the descriptor
//! from the [`StateStore`] before acting; nothing here waits on the daemon.

use crate::config::{ConfigChanges, Configuration};
use crate::daemon::Supervisor;
use crate::error::ControlError;
use crate::git::{GitCli, Repository};
use crate::models::{DaemonDescriptor, DaemonReport};
use crate::store::StateStore;
use std::path::Path;

/// Detect the repository at `cwd`, validate the credential, persist the
/// configuration and spawn a daemon for the repository root.
///
/// Aborts at the first failure. A descriptor naming a live daemon blocks the
/// spawn; a stale one is overwritten.
pub fn init<S: Supervisor>(
    store: &StateStore,
    supervisor: &S,
    cwd: &Path,
) -> Result<DaemonDescriptor, ControlError> {
    let root = GitCli::in_dir(cwd).root().map_err(ControlError::Root)?;

    if let Some(existing) = store.load_descriptor()? {
        if supervisor.is_alive(existing.pid) {
            return Err(ControlError::AlreadyRunning {
                pid: existing.pid,
                path: existing.repo_path,
            });
        }
        log::debug!("Replacing stale descriptor for PID {}", existing.pid);
    }

    let mut config = store.load_config()?;
    let mut effective = config.clone();
    effective.apply_env_overrides()?;
    effective.validate_credential()?;

    config.root_path = Some(root.clone());
    store.ensure_directories()?;
    store.save_config(&config)?;

    supervisor.spawn(&root, store)
}

/// Inspect the descriptor without modifying anything
pub fn status<S: Supervisor>(
    store: &StateStore,
    supervisor: &S,
) -> Result<DaemonReport, ControlError> {
    let report = match store.load_descriptor()? {
        None => DaemonReport::NotRunning,
        Some(descriptor) if supervisor.is_alive(descriptor.pid) => DaemonReport::Alive(descriptor),
        Some(descriptor) => DaemonReport::Crashed(descriptor),
    };
    Ok(report)
}

/// Stop the daemon named by the descriptor and remove the descriptor.
///
/// A descriptor whose process is gone is removed and reported as
/// [`ControlError::NotRunning`] carrying the stale pid.
pub fn pause<S: Supervisor>(
    store: &StateStore,
    supervisor: &S,
) -> Result<DaemonDescriptor, ControlError> {
    let descriptor = store
        .load_descriptor()?
        .ok_or(ControlError::NotRunning { stale_pid: None })?;

    if !supervisor.is_alive(descriptor.pid) {
        store.delete_descriptor()?;
        return Err(ControlError::NotRunning {
            stale_pid: Some(descriptor.pid),
        });
    }

    supervisor.terminate(descriptor.pid)?;
    store.delete_descriptor()?;
    Ok(descriptor)
}

/// Apply `changes`, validate the resulting credential and persist.
///
/// A running daemon keeps its configuration until restarted.
pub fn reconfigure(
    store: &StateStore,
    changes: &ConfigChanges,
) -> Result<Configuration, ControlError> {
    let mut config = store.load_config()?;
    changes.apply(&mut config)?;
    config.validate_credential()?;
    store.save_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Provider;
    use crate::daemon::ProcessSupervisor;
    use crate::error::ValidationError;
    use crate::models::DaemonStatus;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::process::{Child, Command};
    use tempfile::tempdir;

    /// Real liveness and termination; `spawn` starts `sleep` instead of autogit
    #[derive(Default)]
    struct SleepSupervisor {
        children: RefCell<Vec<Child>>,
    }

    impl Supervisor for SleepSupervisor {
        fn spawn(&self, root: &Path, store: &StateStore) -> Result<DaemonDescriptor, ControlError> {
            let child = Command::new("sleep")
                .arg("30")
                .spawn()
                .map_err(|source| ControlError::Spawn {
                    context: "failed to spawn sleep",
                    source,
                })?;
            let descriptor = DaemonDescriptor::running(child.id(), root.to_path_buf());
            store.save_descriptor(&descriptor)?;
            self.children.borrow_mut().push(child);
            Ok(descriptor)
        }

        fn is_alive(&self, pid: u32) -> bool {
            // Reap exited children so they do not linger as zombies
            for child in self.children.borrow_mut().iter_mut() {
                let _ = child.try_wait();
            }
            ProcessSupervisor::new().is_alive(pid)
        }

        fn terminate(&self, pid: u32) -> Result<(), ControlError> {
            ProcessSupervisor::new().terminate(pid)?;
            for child in self.children.borrow_mut().iter_mut() {
                if child.id() == pid {
                    let _ = child.wait();
                }
            }
            Ok(())
        }
    }

    impl Drop for SleepSupervisor {
        fn drop(&mut self) {
            for child in self.children.get_mut().iter_mut() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git_repo(dir: &Path) -> PathBuf {
        let repo = dir.join("website");
        std::fs::create_dir_all(&repo).unwrap();
        let status = Command::new("git")
            .args(["init", "-q"])
            .current_dir(&repo)
            .status()
            .unwrap();
        assert!(status.success());
        repo.canonicalize().unwrap()
    }

    fn configured_store(dir: &Path) -> StateStore {
        let store = StateStore::new(dir.join("config"));
        store
            .save_config(&Configuration {
                provider: Provider::OpenAi,
                api_key: "sk-test-key".to_string(),
                ..Default::default()
            })
            .unwrap();
        store
    }

    #[test]
    fn test_status_without_descriptor() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());

        let report = status(&store, &ProcessSupervisor::new()).unwrap();

        assert_eq!(report, DaemonReport::NotRunning);
    }

    #[test]
    fn test_status_reports_live_descriptor() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let descriptor = DaemonDescriptor::running(std::process::id(), PathBuf::from("/srv/repo"));
        store.save_descriptor(&descriptor).unwrap();

        let report = status(&store, &ProcessSupervisor::new()).unwrap();

        assert_eq!(report, DaemonReport::Alive(descriptor));
    }

    #[test]
    fn test_status_reports_crash_without_cleanup() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let supervisor = SleepSupervisor::default();
        let descriptor = supervisor.spawn(Path::new("/srv/repo"), &store).unwrap();
        supervisor.terminate(descriptor.pid).unwrap();

        let report = status(&store, &supervisor).unwrap();

        assert_eq!(report, DaemonReport::Crashed(descriptor));
        assert!(store.descriptor_path().exists(), "status never cleans up");
    }

    #[test]
    fn test_pause_without_descriptor_creates_nothing() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());

        let err = pause(&store, &ProcessSupervisor::new()).unwrap_err();

        assert!(matches!(err, ControlError::NotRunning { stale_pid: None }));
        assert!(!store.descriptor_path().exists());
    }

    #[test]
    fn test_pause_stops_live_daemon() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let supervisor = SleepSupervisor::default();
        let descriptor = supervisor.spawn(Path::new("/srv/repo"), &store).unwrap();

        let stopped = pause(&store, &supervisor).unwrap();

        assert_eq!(stopped, descriptor);
        assert!(!supervisor.is_alive(descriptor.pid));
        assert!(store.load_descriptor().unwrap().is_none());
    }

    #[test]
    fn test_pause_removes_stale_descriptor() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let supervisor = SleepSupervisor::default();
        let descriptor = supervisor.spawn(Path::new("/srv/repo"), &store).unwrap();
        supervisor.terminate(descriptor.pid).unwrap();

        let err = pause(&store, &supervisor).unwrap_err();

        assert!(matches!(
            err,
            ControlError::NotRunning { stale_pid: Some(pid) } if pid == descriptor.pid
        ));
        assert!(store.load_descriptor().unwrap().is_none());
    }

    #[test]
    fn test_init_outside_repository_fails_first() {
        if !git_available() {
            eprintln!("git not available, skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let store = configured_store(dir.path());
        let supervisor = SleepSupervisor::default();

        let err = init(&store, &supervisor, dir.path()).unwrap_err();

        assert!(matches!(err, ControlError::Root(_)));
        assert!(store.load_descriptor().unwrap().is_none());
    }

    #[test]
    fn test_init_rejects_bad_credential_before_spawn() {
        if !git_available() {
            eprintln!("git not available, skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let repo = git_repo(dir.path());
        let store = StateStore::new(dir.path().join("config"));
        store
            .save_config(&Configuration {
                provider: Provider::Anthropic,
                api_key: "sk-proj-not-anthropic".to_string(),
                ..Default::default()
            })
            .unwrap();

        let err = init(&store, &SleepSupervisor::default(), &repo).unwrap_err();

        assert!(matches!(
            err,
            ControlError::Validation(ValidationError::CredentialPrefix { .. })
        ));
        assert!(store.load_descriptor().unwrap().is_none());
        assert!(store.load_config().unwrap().root_path.is_none());
    }

    #[test]
    fn test_init_records_root_and_spawns() {
        if !git_available() {
            eprintln!("git not available, skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let repo = git_repo(dir.path());
        let nested = repo.join("src");
        std::fs::create_dir_all(&nested).unwrap();
        let store = configured_store(dir.path());
        let supervisor = SleepSupervisor::default();

        let descriptor = init(&store, &supervisor, &nested).unwrap();

        assert_eq!(descriptor.repo_path, repo);
        assert_eq!(descriptor.status, DaemonStatus::Running);
        assert_eq!(store.load_descriptor().unwrap(), Some(descriptor.clone()));
        assert_eq!(store.load_config().unwrap().root_path, Some(repo));
        assert!(supervisor.is_alive(descriptor.pid));
    }

    #[test]
    fn test_init_refuses_second_live_daemon() {
        if !git_available() {
            eprintln!("git not available, skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let repo = git_repo(dir.path());
        let store = configured_store(dir.path());
        let supervisor = SleepSupervisor::default();
        let first = init(&store, &supervisor, &repo).unwrap();

        let err = init(&store, &supervisor, &repo).unwrap_err();

        assert!(matches!(err, ControlError::AlreadyRunning { pid, .. } if pid == first.pid));
        assert_eq!(supervisor.children.borrow().len(), 1);
    }

    #[test]
    fn test_init_overwrites_stale_descriptor() {
        if !git_available() {
            eprintln!("git not available, skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let repo = git_repo(dir.path());
        let store = configured_store(dir.path());
        let supervisor = SleepSupervisor::default();
        let first = init(&store, &supervisor, &repo).unwrap();
        supervisor.terminate(first.pid).unwrap();

        let second = init(&store, &supervisor, &repo).unwrap();

        assert_ne!(second.pid, first.pid);
        assert_eq!(store.load_descriptor().unwrap(), Some(second));
    }

    #[test]
    fn test_reconfigure_persists_valid_changes() {
        let dir = tempdir().unwrap();
        let store = configured_store(dir.path());
        let changes = ConfigChanges {
            provider: Some(Provider::Anthropic),
            api_key: Some("sk-ant-api03-new".to_string()),
            check_interval_minutes: Some(15),
            ..Default::default()
        };

        let updated = reconfigure(&store, &changes).unwrap();

        assert_eq!(store.load_config().unwrap(), updated);
        assert_eq!(updated.provider, Provider::Anthropic);
        assert_eq!(updated.check_interval_minutes, 15);
    }

    #[test]
    fn test_reconfigure_rejects_mismatched_credential() {
        let dir = tempdir().unwrap();
        let store = configured_store(dir.path());
        let before = store.load_config().unwrap();
        let changes = ConfigChanges {
            provider: Some(Provider::Gemini),
            ..Default::default()
        };

        let err = reconfigure(&store, &changes).unwrap_err();

        assert!(matches!(
            err,
            ControlError::Validation(ValidationError::CredentialTooShort { .. })
        ));
        assert_eq!(store.load_config().unwrap(), before, "nothing persisted");
    }
}
