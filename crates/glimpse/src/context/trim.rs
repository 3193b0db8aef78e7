//! Bounded trimming of terminal output and git state.
//!
//! Trimmers take a context by reference and return a new one. Whenever
//! anything is cut the token estimate is recomputed from the surviving text
//! and capped, so a caller can trust it without re-tokenizing.

use crate::budget::allocation::BudgetAllocation;
use crate::context::{CaptureContext, GitContext, TerminalContext};
use crate::estimate_text_tokens;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::debug;

/// Upper bound on a trimmed terminal context's token estimate.
pub const TERMINAL_TOKEN_CAP: usize = 400;
/// Upper bound on a trimmed git context's token estimate.
pub const GIT_TOKEN_CAP: usize = 200;
/// Output lines kept per allowed line, relative to `max_lines`.
const OUTPUT_LINE_FACTOR: f64 = 1.5;

/// Keep the most recent errors and output within `max_lines`.
///
/// Returns an unchanged copy when errors and output together already fit.
pub fn trim_terminal_context(context: &TerminalContext, max_lines: usize) -> TerminalContext {
    let total = context.line_count();
    if total <= max_lines {
        return context.clone();
    }

    let output_lines = (max_lines as f64 * OUTPUT_LINE_FACTOR).ceil() as usize;
    let errors = tail(&context.errors, max_lines);
    let recent_output = tail(&context.recent_output, output_lines);

    let tokens: usize = errors
        .iter()
        .chain(&recent_output)
        .map(|line| estimate_text_tokens(line))
        .sum();
    let token_estimate = tokens.min(TERMINAL_TOKEN_CAP);

    debug!(
        lines = total,
        errors = errors.len(),
        output = recent_output.len(),
        token_estimate,
        "trimmed terminal context"
    );
    TerminalContext {
        recent_output,
        errors,
        token_estimate,
    }
}

/// Shrink the git diff to `max_diff_lines`, or replace it with a per-file
/// summary when the full diff is not wanted.
pub fn trim_git_context(
    context: &GitContext,
    max_diff_lines: usize,
    include_full_diff: bool,
) -> GitContext {
    let Some(diff) = context.diff.as_deref() else {
        return context.clone();
    };
    let lines: Vec<&str> = diff.lines().collect();
    let total = lines.len();

    let trimmed = if include_full_diff {
        if total <= max_diff_lines {
            return context.clone();
        }
        let mut kept = lines[..max_diff_lines].join("\n");
        let _ = write!(kept, "\n... {} more lines", total - max_diff_lines);
        kept
    } else {
        format!(
            "{}\n\n(Full diff omitted — {total} lines)",
            stat_summary(&lines)
        )
    };

    debug!(lines = total, max_diff_lines, include_full_diff, "trimmed git diff");
    let mut git = GitContext {
        diff: Some(trimmed),
        ..context.clone()
    };
    git.token_estimate = git_tokens(&git);
    git
}

/// Trim a whole capture context to an allocation's limits.
///
/// Commits are dropped entirely when the allocation leaves no room for them.
pub fn trim_to_allocation(
    context: &CaptureContext,
    allocation: &BudgetAllocation,
) -> CaptureContext {
    let terminal = trim_terminal_context(&context.terminal, allocation.terminal_lines);
    let mut git = trim_git_context(
        &context.git,
        allocation.git_diff_lines,
        allocation.include_full_diff,
    );
    if !allocation.include_commits && !git.recent_commits.is_empty() {
        debug!(commits = git.recent_commits.len(), "dropping commit history");
        git.recent_commits.clear();
        git.token_estimate = git_tokens(&git).min(git.token_estimate);
    }
    CaptureContext { terminal, git }
}

/// Token estimate of everything a git context will render, capped.
fn git_tokens(git: &GitContext) -> usize {
    let commits: usize = git
        .recent_commits
        .iter()
        .map(|c| estimate_text_tokens(c))
        .sum();
    let diff = git.diff.as_deref().map_or(0, estimate_text_tokens);
    (estimate_text_tokens(&git.branch) + commits + diff).min(GIT_TOKEN_CAP)
}

fn tail(lines: &[String], n: usize) -> Vec<String> {
    lines[lines.len().saturating_sub(n)..].to_vec()
}

/// `git diff --stat`-style summary: one line per file plus a totals line.
fn stat_summary(lines: &[&str]) -> String {
    let mut files: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    let mut current: Option<&str> = None;
    let (mut insertions, mut deletions) = (0, 0);

    for line in lines {
        if let Some(paths) = line.strip_prefix("diff --git ") {
            let path = paths.rsplit_once(" b/").map_or(paths, |(_, b)| b);
            files.entry(path).or_default();
            current = Some(path);
        } else if line.starts_with("+++") || line.starts_with("---") {
            continue;
        } else if line.starts_with('+') {
            insertions += 1;
            if let Some(counts) = current.and_then(|p| files.get_mut(p)) {
                counts.0 += 1;
            }
        } else if line.starts_with('-') {
            deletions += 1;
            if let Some(counts) = current.and_then(|p| files.get_mut(p)) {
                counts.1 += 1;
            }
        }
    }

    let mut out = String::new();
    for (path, (added, removed)) in &files {
        let _ = writeln!(out, " {path} | +{added} -{removed}");
    }
    let _ = write!(
        out,
        " {} files changed, {insertions} insertions(+), {deletions} deletions(-)",
        files.len()
    );
    out
}
