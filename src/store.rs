//! Persisted state
//!
//! `StateStore` owns the user-scoped configuration directory:
//!
//! ```text
//! <root>/config.toml        configuration record
//! <root>/daemon.json        daemon descriptor (absent = no daemon)
//! <root>/logs/<repo>.log    append-only log per monitored repository
//! ```
//!
//! There is no cross-process locking. Every write replaces the whole file via a
//! sibling temp file and a rename, so readers observe either the previous or the
//! new record; concurrent writers race and the last one wins.

use crate::config::Configuration;
use crate::constants::{
    APP_NAME, CONFIG_DIR_ENV, CONFIG_FILE_NAME, DAEMON_FILE_NAME, LOGS_DIR_NAME,
};
use crate::error::ConfigError;
use crate::models::{DaemonDescriptor, DaemonStatus};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Handle to the configuration directory shared by all autogit processes
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    /// Store rooted at an explicit directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the store location: explicit override, then `AUTOGIT_CONFIG_DIR`,
    /// then the platform configuration directory.
    ///
    /// Relative locations are anchored to the current directory here, once, so
    /// a spawned daemon running elsewhere opens the same files.
    pub fn resolve(override_dir: Option<PathBuf>) -> Self {
        let root = override_dir
            .or_else(|| {
                std::env::var_os(CONFIG_DIR_ENV)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(Self::default_root);
        match std::env::current_dir() {
            Ok(cwd) => Self::new(anchor(root, &cwd)),
            Err(e) => {
                log::warn!("Cannot read current directory: {}", e);
                Self::new(root)
            }
        }
    }

    /// Platform configuration directory, or `./.autogit` when there is none
    pub fn default_root() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .unwrap_or_else(|| PathBuf::from(format!(".{}", APP_NAME)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.root.join(DAEMON_FILE_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR_NAME)
    }

    /// Log file for a repository, keyed by the repository directory's base name
    pub fn log_path(&self, repo_name: &str) -> PathBuf {
        self.logs_dir().join(format!("{}.log", repo_name))
    }

    /// Create the root and logs directories if missing
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        let logs = self.logs_dir();
        fs::create_dir_all(&logs).map_err(|source| ConfigError::Write {
            path: logs,
            source,
        })
    }

    // ----- configuration record -----

    /// Load the configuration record.
    ///
    /// A missing file is created with defaults. A malformed file is left on disk
    /// for the user to fix and defaults are returned in its place.
    pub fn load_config(&self) -> Result<Configuration, ConfigError> {
        let path = self.config_path();
        match fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str::<Configuration>(&raw) {
                Ok(config) => Ok(config),
                Err(e) => {
                    log::warn!(
                        "Ignoring malformed configuration {}: {}; using defaults",
                        path.display(),
                        e
                    );
                    Ok(Configuration::default())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let config = Configuration::default();
                self.save_config(&config)?;
                Ok(config)
            }
            Err(source) => {
                log::warn!(
                    "Cannot read configuration {}: {}; using defaults",
                    path.display(),
                    source
                );
                Ok(Configuration::default())
            }
        }
    }

    /// Load the configuration record with `AUTOGIT_*` overrides applied
    pub fn load_effective_config(&self) -> anyhow::Result<Configuration> {
        let mut config = self.load_config()?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn save_config(&self, config: &Configuration) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize {
            what: "configuration",
            message: e.to_string(),
        })?;
        self.write_atomic(&self.config_path(), raw.as_bytes())
    }

    // ----- daemon descriptor -----

    /// Load the daemon descriptor. `Ok(None)` means no daemon was started.
    pub fn load_descriptor(&self) -> Result<Option<DaemonDescriptor>, ConfigError> {
        let path = self.descriptor_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| ConfigError::Malformed {
                path,
                message: e.to_string(),
            })
    }

    pub fn save_descriptor(&self, descriptor: &DaemonDescriptor) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(descriptor).map_err(|e| ConfigError::Serialize {
            what: "daemon descriptor",
            message: e.to_string(),
        })?;
        self.write_atomic(&self.descriptor_path(), raw.as_bytes())
    }

    /// Remove the descriptor. Returns whether one existed.
    pub fn delete_descriptor(&self) -> Result<bool, ConfigError> {
        let path = self.descriptor_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ConfigError::Write { path, source }),
        }
    }

    /// Rewrite the descriptor's status if it still names `pid`.
    ///
    /// Returns `false` (and writes nothing) when the descriptor is absent or
    /// belongs to another process, so a daemon never recreates a descriptor a
    /// control process has removed.
    pub fn update_descriptor_status(
        &self,
        pid: u32,
        status: DaemonStatus,
    ) -> Result<bool, ConfigError> {
        match self.load_descriptor()? {
            Some(mut descriptor) if descriptor.pid == pid => {
                if descriptor.status != status {
                    descriptor.status = status;
                    self.save_descriptor(&descriptor)?;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Remove the descriptor if it still names `pid`
    pub fn delete_descriptor_if_owned(&self, pid: u32) -> Result<bool, ConfigError> {
        match self.load_descriptor()? {
            Some(descriptor) if descriptor.pid == pid => self.delete_descriptor(),
            _ => Ok(false),
        }
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.root).map_err(|source| ConfigError::Write {
            path: self.root.clone(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

        fs::write(&tmp, contents).map_err(|source| ConfigError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            ConfigError::Write {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

fn anchor(root: PathBuf, cwd: &Path) -> PathBuf {
    if root.is_absolute() {
        root
    } else {
        cwd.join(root)
    }
}
