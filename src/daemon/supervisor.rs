//! Spawning, probing and stopping the detached daemon process

use crate::constants::DAEMON_RUN_SUBCOMMAND;
use crate::error::ControlError;
use crate::models::DaemonDescriptor;
use crate::store::StateStore;
use std::path::Path;
use std::process::{Command, Stdio};
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

/// Process-level operations the control surface needs
pub trait Supervisor {
    /// Launch a daemon for `root` and record its descriptor
    fn spawn(&self, root: &Path, store: &StateStore) -> Result<DaemonDescriptor, ControlError>;
    /// Whether `pid` names a live process
    fn is_alive(&self, pid: u32) -> bool;
    /// Request a graceful shutdown of `pid`
    fn terminate(&self, pid: u32) -> Result<(), ControlError>;
}

/// [`Supervisor`] over real OS processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSupervisor;

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self
    }
}

impl Supervisor for ProcessSupervisor {
    /// Launch a detached child running the daemon loop for `root`.
    ///
    /// The child gets the resolved store location explicitly so it never
    /// re-derives it. The descriptor is written only after a successful spawn.
    fn spawn(&self, root: &Path, store: &StateStore) -> Result<DaemonDescriptor, ControlError> {
        let current_exe = std::env::current_exe().map_err(|source| ControlError::Spawn {
            context: "failed to locate current executable",
            source,
        })?;

        let mut cmd = Command::new(current_exe);
        cmd.arg(DAEMON_RUN_SUBCOMMAND)
            .arg(root)
            .arg("--config-dir")
            .arg(store.root())
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut cmd);

        let child = cmd.spawn().map_err(|source| ControlError::Spawn {
            context: "failed to spawn daemon process",
            source,
        })?;

        let descriptor = DaemonDescriptor::running(child.id(), root.to_path_buf());
        store.save_descriptor(&descriptor)?;
        log::debug!("Spawned daemon {} for {}", child.id(), root.display());

        // The child outlives this handle; dropping it neither waits nor kills
        drop(child);
        Ok(descriptor)
    }

    /// Zombie and dead processes count as not alive
    fn is_alive(&self, pid: u32) -> bool {
        if pid == 0 {
            return false;
        }

        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        match system.process(pid) {
            Some(process) => !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead),
            None => false,
        }
    }

    /// SIGTERM on unix; the daemon finishes any running cycle first
    fn terminate(&self, pid: u32) -> Result<(), ControlError> {
        send_terminate(pid).map_err(|message| ControlError::Terminate { pid, message })
    }
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // New process group: a Ctrl-C in the launching terminal does not reach the daemon
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}

#[cfg(unix)]
fn send_terminate(pid: u32) -> Result<(), String> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid as NixPid;

    let raw = i32::try_from(pid).map_err(|_| format!("invalid pid {}", pid))?;
    kill(NixPid::from_raw(raw), Signal::SIGTERM).map_err(|errno| errno.to_string())
}

#[cfg(not(unix))]
fn send_terminate(pid: u32) -> Result<(), String> {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    match system.process(pid) {
        Some(process) if process.kill() => Ok(()),
        Some(_) => Err("kill request was rejected".to_string()),
        None => Err("no such process".to_string()),
    }
}
