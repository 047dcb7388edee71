//! Output formatting module
//!
//! Human-readable rendering of control results, the configuration record and
//! repository log records. Formatting functions return strings; the CLI prints.

use crate::config::Configuration;
use crate::models::{DaemonDescriptor, DaemonReport};
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Render a status report
pub fn format_status(report: &DaemonReport) -> String {
    match report {
        DaemonReport::NotRunning => "Daemon is not running.".to_string(),
        DaemonReport::Alive(descriptor) => format!(
            "Daemon is {}\n  PID: {}\n  Repository: {}",
            descriptor.status,
            descriptor.pid,
            descriptor.repo_path.display()
        ),
        DaemonReport::Crashed(descriptor) => format!(
            "Daemon crashed (PID {} is not running)\n  Repository: {}\n  Run 'autogit pause' to clean up, then 'autogit init' to restart.",
            descriptor.pid,
            descriptor.repo_path.display()
        ),
    }
}

pub fn format_started(descriptor: &DaemonDescriptor, interval_minutes: u64) -> String {
    format!(
        "✅ autogit daemon started (PID: {})\n  Repository: {}\n  Check interval: {} min\n  View logs: autogit logs\n  Stop daemon: autogit pause",
        descriptor.pid,
        descriptor.repo_path.display(),
        interval_minutes
    )
}

pub fn format_stopped(descriptor: &DaemonDescriptor) -> String {
    format!(
        "Daemon stopped (PID: {}, repository: {})",
        descriptor.pid,
        descriptor.repo_path.display()
    )
}

/// Render the configuration with the credential masked
pub fn format_config(config: &Configuration, config_path: &Path) -> String {
    let mut lines = vec![
        format!("Configuration: {}", config_path.display()),
        format!("  provider: {}", config.provider.as_str()),
        format!("  api_key: {}", mask_key(&config.api_key)),
    ];
    if let Some(ref base_url) = config.base_url {
        lines.push(format!("  base_url: {}", base_url));
    }
    if let Some(ref model) = config.model {
        lines.push(format!("  model: {}", model));
    }
    lines.push(format!(
        "  check_interval_minutes: {} (effective {} min)",
        config.check_interval_minutes,
        config.poll_interval().as_secs() / 60
    ));
    if let Some(ref root) = config.root_path {
        lines.push(format!("  root_path: {}", root.display()));
    }
    lines.join("\n")
}

/// Show only the ends of a credential
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        n if n <= 12 => "****".to_string(),
        n => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }
}

/// Render one log record without its JSON payload
pub fn format_log_line(line: &str) -> &str {
    match line.rsplit_once(" | {") {
        Some((human, _)) => human,
        None => line,
    }
}

/// Last `count` lines of the file at `path`
pub fn tail_lines(path: &Path, count: usize) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut tail = VecDeque::with_capacity(count.min(1024));
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if tail.len() == count {
            tail.pop_front();
        }
        if count > 0 {
            tail.push_back(line);
        }
    }
    Ok(tail.into())
}
