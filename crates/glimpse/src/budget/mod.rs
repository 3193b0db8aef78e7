//! Token budgets: who gets how much of the model's window.
//!
//! - **[`profile`]** — [`ModelProfile`] data and the [`ProfileRegistry`] that
//!   resolves names to profiles, falling back to `default`.
//! - **[`allocation`]** — [`allocate`] splits a profile's window into
//!   visual, code, and execution budgets and derives frame and line limits.
//! - **[`utilization`]** — [`calculate_utilization`] accounts for a planned
//!   payload; [`validate`] checks it against the 95% safety margin.

pub mod allocation;
pub mod profile;
pub mod utilization;

pub use allocation::{BudgetAllocation, CategoryBudgets, Resolution, allocate};
pub use profile::{
    ContextBias, FocusLevel, ModelProfile, ProfileRegistry, PromptStyle, Verbosity,
};
pub use utilization::{
    BreakdownRow, BudgetValidation, TokenUtilization, calculate_utilization, frames_needed,
    frames_over_budget, validate,
};
