//! Global constants for autogit
//!
//! Centralized location for application-wide constants

use std::time::Duration;

/// Application name, used for the configuration directory and notifications
pub const APP_NAME: &str = "autogit";

/// Environment variable that overrides the configuration directory
pub const CONFIG_DIR_ENV: &str = "AUTOGIT_CONFIG_DIR";

/// Prefix for environment overrides of configuration fields
pub const ENV_PREFIX: &str = "AUTOGIT_";

/// Configuration record file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Daemon descriptor file name
pub const DAEMON_FILE_NAME: &str = "daemon.json";

/// Subdirectory holding one log file per monitored repository
pub const LOGS_DIR_NAME: &str = "logs";

/// Hidden subcommand the spawned child runs
pub const DAEMON_RUN_SUBCOMMAND: &str = "start-daemon";

/// Poll interval used when the configured one is missing or non-positive
pub const DEFAULT_CHECK_INTERVAL_MINUTES: i64 = 10;

/// Longest accepted poll interval (one week)
pub const MAX_CHECK_INTERVAL_MINUTES: i64 = 7 * 24 * 60;

/// Maximum diff length (bytes) sent to a backend
pub const MAX_DIFF_BYTES: usize = 100_000;

/// Appended to a diff that was cut at `MAX_DIFF_BYTES`
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Upper bound for a single backend request
pub const BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Instruction sent ahead of every diff
pub const SYSTEM_PROMPT: &str = "You are a git automation bot. Analyze the provided code diff. \
Respond ONLY with a concise, Conventional Commit message (e.g., 'fix(ui): adjust button padding'). \
Do not add quotes or markdown.";

pub const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-3-flash-preview";

pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub const OPENROUTER_DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENROUTER_DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";
pub const OPENROUTER_REFERER: &str = "https://github.com/aadityansha/autogit";
pub const OPENROUTER_TITLE: &str = "Autogit";

pub const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_MAX_TOKENS: u32 = 1024;

/// Event names used in structured repository log records
pub const EVENT_DAEMON_STARTUP: &str = "daemon_startup";
pub const EVENT_DAEMON_SHUTDOWN: &str = "daemon_shutdown";
pub const EVENT_CYCLE_STEP: &str = "cycle_step";
pub const EVENT_STATE_CHANGE: &str = "state_change";
