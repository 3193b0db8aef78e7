//! Token accounting for a planned payload and validation against the
//! model's window.
//!
//! Validation never fails hard. An over-budget payload comes back with
//! `valid = false` and advisory suggestions; the shrink loop in
//! [`context::eviction`](crate::context::eviction) acts on them.

use crate::ScoredFrame;
use crate::budget::allocation::SAFETY_MARGIN;
use crate::budget::profile::ModelProfile;
use crate::context::CaptureContext;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Fixed cost of section headers and separators in the final prompt.
pub const STRUCTURE_TOKENS: usize = 100;
/// Highest utilization percentage that still validates.
pub const UTILIZATION_LIMIT_PCT: f64 = 95.0;

/// Frames are only suggested for dropping when more than this many remain.
const MIN_FRAMES_FOR_DROP_SUGGESTION: usize = 4;
const TERMINAL_SUGGESTION_TOKENS: usize = 500;
const DIFF_SUGGESTION_LINES: usize = 50;

/// One row of the utilization breakdown.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BreakdownRow {
    pub category: String,
    pub tokens: usize,
    /// Share of the model's window.
    pub percent: f64,
}

/// Where a payload's tokens go.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenUtilization {
    pub visual: usize,
    pub text: usize,
    pub prompt: usize,
    pub structure: usize,
    pub total: usize,
    /// The model's context window.
    pub budget: usize,
    /// `total` as a percentage of `budget`.
    pub utilization: f64,
    pub frame_count: usize,
    pub terminal_tokens: usize,
    pub diff_lines: usize,
    pub breakdown: Vec<BreakdownRow>,
}

impl TokenUtilization {
    /// Average token cost of one frame, 0 with no frames.
    pub fn avg_frame_cost(&self) -> f64 {
        if self.frame_count == 0 {
            0.0
        } else {
            self.visual as f64 / self.frame_count as f64
        }
    }

    /// Tokens above the safety margin, 0 when within it.
    pub fn overage(&self) -> f64 {
        (self.total as f64 - self.budget as f64 * SAFETY_MARGIN).max(0.0)
    }

    /// Render the breakdown as a markdown table.
    pub fn to_table(&self) -> String {
        let mut out = String::from("| Category | Tokens | % of budget |\n|---|---:|---:|\n");
        for row in &self.breakdown {
            let _ = writeln!(
                out,
                "| {} | {} | {:.1}% |",
                row.category, row.tokens, row.percent
            );
        }
        let _ = write!(
            out,
            "| **Total** | **{}** | **{:.1}%** |",
            self.total, self.utilization
        );
        out
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "payload: ~{} tokens ({:.1}% of {}), {} frames",
            self.total, self.utilization, self.budget, self.frame_count
        )
    }
}

/// Outcome of [`validate`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BudgetValidation {
    pub valid: bool,
    /// Advisory only. Empty when `valid`.
    pub suggestions: Vec<String>,
}

/// Account for every token the payload will cost.
///
/// `frames` must already carry their codec token estimates.
pub fn calculate_utilization(
    profile: &ModelProfile,
    frames: &[ScoredFrame],
    context: &CaptureContext,
    prompt_tokens: usize,
) -> TokenUtilization {
    let visual: usize = frames.iter().map(|f| f.token_estimate).sum();
    let terminal_tokens = context.terminal.token_estimate;
    let git_tokens = context.git.token_estimate;
    let text = terminal_tokens + git_tokens;
    let total = visual + text + STRUCTURE_TOKENS + prompt_tokens;
    let budget = profile.max_tokens;

    let percent_of = |tokens: usize| -> f64 {
        if budget == 0 {
            100.0
        } else {
            100.0 * tokens as f64 / budget as f64
        }
    };
    let row = |category: String, tokens: usize| BreakdownRow {
        category,
        tokens,
        percent: percent_of(tokens),
    };

    let breakdown = vec![
        row(format!("Visual ({} frames)", frames.len()), visual),
        row("Terminal".to_string(), terminal_tokens),
        row("Git".to_string(), git_tokens),
        row("Prompt".to_string(), prompt_tokens),
        row("Structure".to_string(), STRUCTURE_TOKENS),
    ];

    TokenUtilization {
        visual,
        text,
        prompt: prompt_tokens,
        structure: STRUCTURE_TOKENS,
        total,
        budget,
        utilization: percent_of(total),
        frame_count: frames.len(),
        terminal_tokens,
        diff_lines: context.git.diff_line_count(),
        breakdown,
    }
}

/// Check a payload against the safety margin and suggest what to cut.
pub fn validate(utilization: &TokenUtilization) -> BudgetValidation {
    if utilization.utilization <= UTILIZATION_LIMIT_PCT {
        return BudgetValidation {
            valid: true,
            suggestions: Vec::new(),
        };
    }

    let mut suggestions = Vec::new();
    if utilization.frame_count > MIN_FRAMES_FOR_DROP_SUGGESTION {
        let drop = frames_needed(utilization);
        suggestions.push(format!(
            "drop {drop} lowest-value frames (~{:.0} tokens each) to recover {:.0} tokens",
            utilization.avg_frame_cost(),
            utilization.overage()
        ));
    }
    if utilization.terminal_tokens > TERMINAL_SUGGESTION_TOKENS {
        suggestions.push(format!(
            "truncate terminal context ({} tokens)",
            utilization.terminal_tokens
        ));
    }
    if utilization.diff_lines > DIFF_SUGGESTION_LINES {
        suggestions.push(format!(
            "summarize the git diff ({} lines) instead of including it in full",
            utilization.diff_lines
        ));
    }

    BudgetValidation {
        valid: false,
        suggestions,
    }
}

/// Frames worth of overage at the average frame cost, at least 1 when over
/// budget. 0 when the payload is already valid.
pub fn frames_needed(utilization: &TokenUtilization) -> usize {
    if utilization.utilization <= UTILIZATION_LIMIT_PCT {
        return 0;
    }
    let avg = utilization.avg_frame_cost();
    if avg > 0.0 {
        ((utilization.overage() / avg).ceil() as usize).max(1)
    } else {
        1
    }
}

/// How many frames to evict to get back under budget, never touching the
/// two anchors. 0 when the payload is already valid.
pub fn frames_over_budget(utilization: &TokenUtilization) -> usize {
    frames_needed(utilization).min(utilization.frame_count.saturating_sub(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Frame;
    use crate::budget::profile::ProfileRegistry;
    use crate::context::{GitContext, TerminalContext};

    fn profile(max_tokens: usize) -> ModelProfile {
        let mut p = ProfileRegistry::with_builtins().get_or_default("default").clone();
        p.max_tokens = max_tokens;
        p
    }

    fn frames(n: usize, cost: usize) -> Vec<ScoredFrame> {
        (0..n)
            .map(|i| {
                let mut f = ScoredFrame::new(Frame::new(i, format!("f{i}.png"), i as f64));
                f.token_estimate = cost;
                f
            })
            .collect()
    }

    fn context(terminal: usize, git: usize) -> CaptureContext {
        CaptureContext {
            terminal: TerminalContext {
                token_estimate: terminal,
                ..Default::default()
            },
            git: GitContext {
                token_estimate: git,
                ..Default::default()
            },
        }
    }

    #[test]
    fn totals_add_up() {
        let u = calculate_utilization(&profile(10_000), &frames(3, 1000), &context(200, 100), 300);
        assert_eq!(u.visual, 3000);
        assert_eq!(u.text, 300);
        assert_eq!(u.structure, STRUCTURE_TOKENS);
        assert_eq!(u.total, 3700);
        assert!((u.utilization - 37.0).abs() < 1e-9);
        assert_eq!(u.frame_count, 3);
        assert_eq!(u.breakdown.len(), 5);
        assert_eq!(u.breakdown[0].category, "Visual (3 frames)");
        assert!((u.breakdown[0].percent - 30.0).abs() < 1e-9);
    }

    #[test]
    fn within_margin_is_valid() {
        let u = calculate_utilization(&profile(10_000), &frames(5, 1000), &context(0, 0), 0);
        let v = validate(&u);
        assert!(v.valid);
        assert!(v.suggestions.is_empty());
        assert_eq!(frames_over_budget(&u), 0);
    }

    #[test]
    fn exactly_at_margin_is_valid() {
        // 9400 + 100 structure = 9500 = 95%.
        let u = calculate_utilization(&profile(10_000), &frames(1, 9400), &context(0, 0), 0);
        assert!((u.utilization - 95.0).abs() < 1e-9);
        assert!(validate(&u).valid);
    }

    #[test]
    fn over_budget_suggests_dropping_frames() {
        // total 10_100 vs limit 9500: overage 600, avg 1000 per frame.
        let u = calculate_utilization(&profile(10_000), &frames(10, 1000), &context(0, 0), 0);
        let v = validate(&u);
        assert!(!v.valid);
        assert!(!v.suggestions.is_empty());
        assert!(v.suggestions[0].starts_with("drop 1 lowest-value frames"));
        assert_eq!(frames_over_budget(&u), 1);
    }

    #[test]
    fn drop_count_rounds_up_and_spares_anchors() {
        let u = calculate_utilization(&profile(10_000), &frames(6, 2500), &context(0, 0), 0);
        // total 15_100, overage 5600, avg 2500: ceil = 3.
        assert_eq!(frames_over_budget(&u), 3);

        let u = calculate_utilization(&profile(1_000), &frames(6, 2500), &context(0, 0), 0);
        assert_eq!(frames_over_budget(&u), 4);
    }

    #[test]
    fn drop_suggestion_reports_the_full_overage() {
        // total 15_100 vs limit 950: overage 14_150, avg 2500: ceil = 6.
        let u = calculate_utilization(&profile(1_000), &frames(6, 2500), &context(0, 0), 0);
        assert_eq!(frames_needed(&u), 6);
        assert_eq!(frames_over_budget(&u), 4);
        let v = validate(&u);
        assert!(v.suggestions[0].starts_with("drop 6 lowest-value frames"));
    }

    #[test]
    fn zero_cost_frames_drop_one() {
        let u = calculate_utilization(&profile(1_000), &frames(6, 0), &context(2000, 0), 0);
        assert!(!validate(&u).valid);
        assert_eq!(frames_over_budget(&u), 1);
    }

    #[test]
    fn text_suggestions() {
        let mut ctx = context(900, 0);
        ctx.git.diff = Some("+line\n".repeat(80));
        let u = calculate_utilization(&profile(1_000), &frames(2, 100), &ctx, 0);
        let v = validate(&u);
        assert!(!v.valid);
        assert_eq!(v.suggestions.len(), 2, "{:?}", v.suggestions);
        assert!(v.suggestions[0].contains("truncate terminal context"));
        assert!(v.suggestions[1].contains("80 lines"));
    }

    #[test]
    fn table_renders_every_row() {
        let u = calculate_utilization(&profile(10_000), &frames(2, 500), &context(50, 25), 425);
        let table = u.to_table();
        assert!(table.starts_with("| Category | Tokens | % of budget |"));
        assert!(table.contains("| Visual (2 frames) | 1000 | 10.0% |"));
        assert!(table.contains("| Terminal | 50 | 0.5% |"));
        assert!(table.contains("| **Total** | **1600** | **16.0%** |"));
        assert!(u.to_log_string().contains("2 frames"));
    }

    #[test]
    fn empty_payload() {
        let u = calculate_utilization(&profile(10_000), &[], &CaptureContext::default(), 0);
        assert_eq!(u.total, STRUCTURE_TOKENS);
        assert_eq!(u.avg_frame_cost(), 0.0);
        assert!(validate(&u).valid);
    }
}
