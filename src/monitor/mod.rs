//! Change detection
//!
//! Point-in-time queries against the working tree: "are there uncommitted
//! modifications" and "what is the diff", the latter capped to a size a
//! backend will accept.

use crate::constants::{MAX_DIFF_BYTES, TRUNCATION_MARKER};
use crate::error::GitError;
use crate::git::Repository;
use std::borrow::Cow;

/// Diff ready to be sent to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDiff {
    pub text: String,
    /// Whether `text` was cut and carries the truncation marker
    pub truncated: bool,
    /// Length in bytes before truncation
    pub original_len: usize,
}

/// Wraps a [`Repository`] with the queries the pipeline runs each cycle
pub struct ChangeMonitor<R> {
    repo: R,
    max_diff_bytes: usize,
}

impl<R: Repository> ChangeMonitor<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            max_diff_bytes: MAX_DIFF_BYTES,
        }
    }

    pub fn with_max_diff_bytes(mut self, max: usize) -> Self {
        self.max_diff_bytes = max;
        self
    }

    pub fn has_changes(&self) -> Result<bool, GitError> {
        self.repo.has_changes()
    }

    /// Current diff, truncated to the configured maximum
    pub fn diff(&self) -> Result<PreparedDiff, GitError> {
        let raw = self.repo.diff()?;
        let original_len = raw.len();
        let (text, truncated) = match truncate_diff(&raw, self.max_diff_bytes) {
            Cow::Borrowed(_) => (raw, false),
            Cow::Owned(cut) => (cut, true),
        };
        Ok(PreparedDiff {
            text,
            truncated,
            original_len,
        })
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
}

/// Cut `diff` to at most `max` bytes (on a char boundary) and append the
/// truncation marker. Diffs at or below `max` are returned unmodified.
pub fn truncate_diff(diff: &str, max: usize) -> Cow<'_, str> {
    if diff.len() <= max {
        return Cow::Borrowed(diff);
    }

    let mut cut = max;
    while cut > 0 && !diff.is_char_boundary(cut) {
        cut -= 1;
    }

    let mut truncated = String::with_capacity(cut + TRUNCATION_MARKER.len());
    truncated.push_str(&diff[..cut]);
    truncated.push_str(TRUNCATION_MARKER);
    Cow::Owned(truncated)
}
