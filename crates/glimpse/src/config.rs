//! Configuration for the [`CapturePlanner`](crate::planner::CapturePlanner).
//!
//! Everything has a sensible default; override through the builder methods.
//!
//! ```ignore
//! let config = PlannerConfig::new()
//!     .with_strategy(SelectionStrategy::Threshold)
//!     .with_diff_threshold(5.0)
//!     .with_max_shrink_attempts(3);
//! ```

use crate::context::eviction::MAX_SHRINK_ATTEMPTS;
use crate::select::diff::{DEFAULT_CHANNEL_THRESHOLD, PerceptualDiff};
use serde::{Deserialize, Serialize};

/// Default minimum diff percentage for the threshold selector.
pub const DEFAULT_DIFF_THRESHOLD: f64 = 3.0;

/// Which selector picks the key frames.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Greedy pick of the biggest visual changes.
    Threshold,
    /// Entropy and reasoning-value scoring with temporal gap repair.
    #[default]
    ModelAware,
}

/// Planner settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfig {
    pub strategy: SelectionStrategy,
    /// Minimum change percentage for a frame to count as a candidate.
    /// Only used by [`SelectionStrategy::Threshold`].
    pub diff_threshold: f64,
    /// Per-channel intensity difference for a pixel to count as changed.
    pub channel_threshold: u8,
    pub max_shrink_attempts: usize,
    /// Prompt cost to account for. Defaults to the profile's prompt style
    /// estimate.
    pub prompt_tokens: Option<usize>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            channel_threshold: DEFAULT_CHANNEL_THRESHOLD,
            max_shrink_attempts: MAX_SHRINK_ATTEMPTS,
            prompt_tokens: None,
        }
    }
}

impl PlannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_diff_threshold(mut self, pct: f64) -> Self {
        self.diff_threshold = pct;
        self
    }

    pub fn with_channel_threshold(mut self, threshold: u8) -> Self {
        self.channel_threshold = threshold;
        self
    }

    pub fn with_max_shrink_attempts(mut self, attempts: usize) -> Self {
        self.max_shrink_attempts = attempts;
        self
    }

    /// Override the prompt token estimate derived from the profile.
    pub fn with_prompt_tokens(mut self, tokens: usize) -> Self {
        self.prompt_tokens = Some(tokens);
        self
    }

    /// Perceptual differ using this config's channel threshold.
    pub fn perceptual_diff(&self) -> PerceptualDiff {
        PerceptualDiff::new().with_channel_threshold(self.channel_threshold)
    }
}
