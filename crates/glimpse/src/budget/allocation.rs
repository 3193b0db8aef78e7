//! Splitting a model's context window across visual, code, and execution
//! signals.
//!
//! [`allocate`] is pure: the same profile, frame count, and context always
//! produce the same [`BudgetAllocation`].

use crate::budget::profile::ModelProfile;
use crate::context::CaptureContext;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fraction of the context window we allow ourselves to fill.
pub const SAFETY_MARGIN: f64 = 0.95;
/// Tokens held back for section headers and formatting.
pub const STRUCTURE_RESERVE: f64 = 500.0;

pub const DEFAULT_QUALITY: u8 = 85;
pub const REDUCED_QUALITY: u8 = 75;
/// Per-frame cost multiplier at [`REDUCED_QUALITY`].
pub const REDUCED_QUALITY_COST: f64 = 0.85;

pub const MAX_TERMINAL_LINES: usize = 100;
pub const MAX_GIT_DIFF_LINES: usize = 150;
const COMMITS_MIN_CODE_BUDGET: f64 = 200.0;
const FULL_DIFF_MIN_CODE_BUDGET: f64 = 500.0;

pub const DEFAULT_RESOLUTION: Resolution = Resolution {
    width: 1280,
    height: 720,
};

/// Target frame dimensions in pixels.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// The token sub-budgets an allocation was derived from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBudgets {
    /// Context window after the safety margin.
    pub available: f64,
    /// `available` minus the structure reserve.
    pub working: f64,
    pub visual: f64,
    pub code: f64,
    pub execution: f64,
}

/// How a capture should be cut down for one model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAllocation {
    pub frame_count: usize,
    pub frame_resolution: Resolution,
    /// JPEG quality, 0..=100.
    pub frame_quality: u8,
    pub terminal_lines: usize,
    pub git_diff_lines: usize,
    pub include_commits: bool,
    pub include_full_diff: bool,
    /// Human-readable notes on every compromise made.
    pub adjustments: Vec<String>,
    pub budgets: CategoryBudgets,
}

impl BudgetAllocation {
    /// Whether the allocation fell back to the cheaper frame quality.
    pub fn quality_reduced(&self) -> bool {
        self.frame_quality < DEFAULT_QUALITY
    }
}

/// Split `profile`'s context window for a capture of `available_frames`
/// frames and the given text `context`.
pub fn allocate(
    profile: &ModelProfile,
    available_frames: usize,
    context: &CaptureContext,
) -> BudgetAllocation {
    let available = profile.max_tokens as f64 * SAFETY_MARGIN;
    let working = (available - STRUCTURE_RESERVE).max(0.0);
    let bias = &profile.context_bias;
    let budgets = CategoryBudgets {
        available,
        working,
        visual: (working * bias.visual).max(0.0),
        code: (working * bias.code).max(0.0),
        execution: (working * bias.execution).max(0.0),
    };

    let frame_cap = profile
        .preferred_frames
        .min(profile.max_frames)
        .min(available_frames);
    let frames_at = |cost: f64| -> usize {
        if cost <= 0.0 {
            frame_cap
        } else {
            ((budgets.visual / cost).floor() as usize).min(frame_cap)
        }
    };

    let mut adjustments = Vec::new();
    let image_cost = profile.image_token_estimate as f64;
    let mut frame_count = frames_at(image_cost);
    let mut frame_quality = DEFAULT_QUALITY;

    if frame_count < profile.preferred_frames && frame_count < available_frames {
        let reduced = frames_at(image_cost * REDUCED_QUALITY_COST);
        if reduced > frame_count {
            adjustments.push(format!(
                "reduced frame quality to {REDUCED_QUALITY} to fit {reduced} frames instead of {frame_count}"
            ));
            frame_count = reduced;
            frame_quality = REDUCED_QUALITY;
        }
    }
    if frame_count < profile.preferred_frames && frame_count < available_frames {
        adjustments.push(format!(
            "frame count {frame_count} is below the preferred {} for {}",
            profile.preferred_frames, profile.name
        ));
    }

    let terminal_lines = ((budgets.execution / 4.0).floor() as usize).min(MAX_TERMINAL_LINES);
    let git_diff_lines = ((budgets.code / 4.0).floor() as usize).min(MAX_GIT_DIFF_LINES);
    let include_commits = budgets.code > COMMITS_MIN_CODE_BUDGET;
    let include_full_diff = budgets.code > FULL_DIFF_MIN_CODE_BUDGET;

    let terminal_total = context.terminal.line_count();
    if terminal_total > terminal_lines {
        adjustments.push(format!(
            "terminal context trimmed from {terminal_total} to {terminal_lines} lines"
        ));
    }
    let diff_total = context.git.diff_line_count();
    if diff_total > git_diff_lines {
        adjustments.push(format!(
            "git diff truncated from {diff_total} to {git_diff_lines} lines"
        ));
    }

    debug!(
        model = %profile.name,
        frames = frame_count,
        quality = frame_quality,
        terminal_lines,
        git_diff_lines,
        visual = budgets.visual,
        "budget allocated"
    );

    BudgetAllocation {
        frame_count,
        frame_resolution: DEFAULT_RESOLUTION,
        frame_quality,
        terminal_lines,
        git_diff_lines,
        include_commits,
        include_full_diff,
        adjustments,
        budgets,
    }
}
