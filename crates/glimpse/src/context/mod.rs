//! Textual capture context and the ways it gets cut down to size.
//!
//! A capture carries two text signals next to its frames: terminal output
//! (with errors split out) and git state. Both arrive with a token estimate
//! already computed by the gatherer. This module provides:
//!
//! 1. **[`CaptureContext`]** and its parts, as plain serde value types.
//!
//! 2. **[`trim`]** — bounded trimming of terminal lines and git diffs. Each
//!    trimmer returns a new context and recomputes the token estimate.
//!
//! 3. **[`eviction`]** — frame eviction by drop priority and the bounded
//!    shrink loop that evicts until the payload validates or the attempt
//!    budget runs out.

pub mod eviction;
pub mod trim;

use serde::{Deserialize, Serialize};

pub use eviction::{ShrinkOutcome, evict_frames, shrink_to_budget};
pub use trim::{trim_git_context, trim_terminal_context, trim_to_allocation};

/// Recent terminal activity.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminalContext {
    /// Most recent output lines, oldest first.
    pub recent_output: Vec<String>,
    /// Lines recognized as errors, oldest first.
    pub errors: Vec<String>,
    pub token_estimate: usize,
}

impl TerminalContext {
    pub fn line_count(&self) -> usize {
        self.recent_output.len() + self.errors.len()
    }
}

/// Repository state at capture time.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GitContext {
    pub branch: String,
    /// One-line commit summaries, newest first.
    pub recent_commits: Vec<String>,
    /// Working tree diff in unified format, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    pub token_estimate: usize,
}

impl GitContext {
    /// Number of lines in the diff, 0 when there is none.
    pub fn diff_line_count(&self) -> usize {
        self.diff.as_deref().map_or(0, |d| d.lines().count())
    }
}

/// Everything textual that accompanies the frames.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct CaptureContext {
    pub terminal: TerminalContext,
    pub git: GitContext,
}

impl CaptureContext {
    /// Combined text token estimate.
    pub fn token_estimate(&self) -> usize {
        self.terminal.token_estimate + self.git.token_estimate
    }

    /// Load a context from a JSON file.
    pub fn load(path: &std::path::Path) -> Result<Self, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read context from {}: {e}", path.display()))?;
        serde_json::from_str(&data)
            .map_err(|e| format!("failed to parse context in {}: {e}", path.display()))
    }
}
