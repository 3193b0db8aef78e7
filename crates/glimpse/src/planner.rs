//! End-to-end capture planning.
//!
//! [`CapturePlanner::plan`] runs the whole pipeline for one request:
//!
//! 1. allocate the profile's window across visual, code, and execution
//! 2. select key frames with the configured strategy
//! 3. trim terminal and git context to the allocation's limits
//! 4. optimize every selected frame and record its token cost
//! 5. evict frames until the payload validates or attempts run out
//!
//! The result is a [`CapturePlan`] a formatter can render directly.

use crate::budget::allocation::{BudgetAllocation, allocate};
use crate::budget::profile::ModelProfile;
use crate::budget::utilization::{BudgetValidation, TokenUtilization};
use crate::codec::FrameCodec;
use crate::config::{PlannerConfig, SelectionStrategy};
use crate::context::CaptureContext;
use crate::context::eviction::shrink_to_budget;
use crate::context::trim::trim_to_allocation;
use crate::select::diff::FrameDiffer;
use crate::select::model_aware::select_model_aware;
use crate::select::threshold::select_by_threshold;
use crate::{Frame, ScoredFrame};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Everything the formatter needs for one capture.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CapturePlan {
    pub model: String,
    pub strategy: SelectionStrategy,
    /// Frames offered to the planner.
    pub total_frames: usize,
    pub allocation: BudgetAllocation,
    /// Surviving frames in chronological order.
    pub frames: Vec<ScoredFrame>,
    /// Context after trimming.
    pub context: CaptureContext,
    pub utilization: TokenUtilization,
    pub validation: BudgetValidation,
    pub shrink_attempts: usize,
}

/// Plans captures for one model profile.
#[derive(Debug, Clone)]
pub struct CapturePlanner<'a> {
    profile: &'a ModelProfile,
    config: PlannerConfig,
}

impl<'a> CapturePlanner<'a> {
    pub fn new(profile: &'a ModelProfile, config: PlannerConfig) -> Self {
        Self { profile, config }
    }

    pub fn profile(&self) -> &ModelProfile {
        self.profile
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Prompt cost charged against the budget: the configured override, or
    /// the profile's prompt style estimate.
    pub fn prompt_tokens(&self) -> usize {
        self.config
            .prompt_tokens
            .unwrap_or_else(|| self.profile.prompt_style.estimated_tokens())
    }

    /// Plan a capture of `frames` with its textual `context`.
    pub fn plan(
        &self,
        frames: &[Frame],
        context: &CaptureContext,
        differ: &impl FrameDiffer,
        codec: &impl FrameCodec,
    ) -> CapturePlan {
        let profile = self.profile;
        let allocation = allocate(profile, frames.len(), context);

        let selected = match self.config.strategy {
            SelectionStrategy::Threshold => {
                select_by_threshold(
                    frames,
                    allocation.frame_count,
                    self.config.diff_threshold,
                    differ,
                )
                .selected
            }
            SelectionStrategy::ModelAware => {
                select_model_aware(frames, profile, allocation.frame_count, differ)
            }
        };
        debug!(
            strategy = ?self.config.strategy,
            selected = selected.len(),
            target = allocation.frame_count,
            "frames selected"
        );

        let context = trim_to_allocation(context, &allocation);

        let optimized: Vec<ScoredFrame> = selected
            .into_iter()
            .map(|mut frame| {
                let out = codec.optimize(&frame, &allocation);
                frame.token_estimate = out.token_estimate;
                if out.locator != frame.frame.locator {
                    frame.optimized_locator = Some(out.locator);
                }
                frame
            })
            .collect();

        let outcome = shrink_to_budget(
            profile,
            optimized,
            &context,
            self.prompt_tokens(),
            self.config.max_shrink_attempts,
        );

        info!(
            model = %profile.name,
            frames = frames.len(),
            selected = outcome.frames.len(),
            valid = outcome.validation.valid,
            shrink_attempts = outcome.attempts,
            "{}",
            outcome.utilization.to_log_string()
        );

        CapturePlan {
            model: profile.name.clone(),
            strategy: self.config.strategy,
            total_frames: frames.len(),
            allocation,
            frames: outcome.frames,
            context,
            utilization: outcome.utilization,
            validation: outcome.validation,
            shrink_attempts: outcome.attempts,
        }
    }
}
