//! Desktop notifications
//!
//! Best-effort: a missing `notify-send`/`osascript` or a failed call is logged
//! and otherwise ignored. Notification failures never affect the daemon loop.

use crate::constants::APP_NAME;
use std::process::Command;

/// Maximum characters of an error or commit message shown in a notification body
const MAX_BODY_CHARS: usize = 200;

/// Sink for user-facing daemon events
pub trait Notifier {
    fn notify(&self, title: &str, body: &str);

    /// A commit was pushed to `repo`
    fn committed(&self, repo: &str, message: &str) {
        let title = format!("Autogit: Committed to {}", repo);
        let body = format!("Commit: {}", shorten(message));
        self.notify(&title, &body);
    }

    /// The loop paused on a push failure in `repo`
    fn paused(&self, repo: &str, error: &str) {
        let title = format!("Autogit Paused: Error in {}", repo);
        let body = format!("Merge Conflict or Network Error: {}", shorten(error));
        self.notify(&title, &body);
    }
}

/// Platform notification tool (`notify-send` on Linux, `osascript` on macOS)
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        let result = if cfg!(target_os = "macos") {
            send_macos(title, body)
        } else {
            send_linux(title, body)
        };

        if let Err(e) = result {
            log::warn!("Desktop notification failed: {}", e);
        }
    }
}

fn send_linux(title: &str, body: &str) -> Result<(), String> {
    let output = Command::new("notify-send")
        .arg(format!("--app-name={}", APP_NAME))
        .arg(title)
        .arg(body)
        .output()
        .map_err(|e| format!("notify-send failed: {}", e))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!("notify-send exited with: {}", output.status))
    }
}

fn send_macos(title: &str, body: &str) -> Result<(), String> {
    let script = format!(
        r#"display notification "{}" with title "{}""#,
        escape_applescript(body),
        escape_applescript(title)
    );

    let output = Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .output()
        .map_err(|e| format!("osascript failed: {}", e))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!("osascript exited with: {}", output.status))
    }
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn shorten(s: &str) -> String {
    let line = s.lines().next().unwrap_or_default();
    if line.chars().count() <= MAX_BODY_CHARS && line.len() == s.len() {
        return s.to_string();
    }
    let mut cut: String = line.chars().take(MAX_BODY_CHARS).collect();
    cut.push_str("...");
    cut
}
