//! Frame eviction: drop the least valuable frames until the payload fits.
//!
//! Frames are the single largest consumer in a capture payload. A frame
//! costs as much as several hundred lines of terminal output, so shedding
//! frames is the first lever and text trimming the second. Anchors (the
//! first and last frames) are never evicted.

use crate::ScoredFrame;
use crate::budget::profile::ModelProfile;
use crate::budget::utilization::{
    BudgetValidation, TokenUtilization, calculate_utilization, frames_over_budget, validate,
};
use crate::context::CaptureContext;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default number of utilization/eviction rounds before giving up.
pub const MAX_SHRINK_ATTEMPTS: usize = 5;

/// Frames the shrink loop never goes below.
const MIN_FRAMES: usize = 2;

/// Keep the `target_count` frames with the lowest drop priority, in
/// chronological order.
///
/// Anchors sort ahead of everything else, so they survive whenever
/// `target_count` is at least the number of anchors. Ties break by index,
/// keeping earlier frames.
pub fn evict_frames(frames: &[ScoredFrame], target_count: usize) -> Vec<ScoredFrame> {
    if frames.len() <= target_count {
        return frames.to_vec();
    }

    let mut ranked: Vec<&ScoredFrame> = frames.iter().collect();
    ranked.sort_by(|a, b| {
        b.anchor
            .cmp(&a.anchor)
            .then(a.drop_priority.total_cmp(&b.drop_priority))
            .then(a.index().cmp(&b.index()))
    });
    ranked.truncate(target_count);
    ranked.sort_by_key(|f| f.index());

    debug!(before = frames.len(), after = ranked.len(), "evicted frames");
    ranked.into_iter().cloned().collect()
}

/// Result of [`shrink_to_budget`].
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ShrinkOutcome {
    pub frames: Vec<ScoredFrame>,
    pub utilization: TokenUtilization,
    pub validation: BudgetValidation,
    /// Eviction rounds performed, 0 when the payload already fit.
    pub attempts: usize,
}

/// Evict frames until the payload validates, at most `max_attempts` rounds.
///
/// The first round drops as many frames as the overage calls for; later
/// rounds drop one at a time. The loop stops at two frames. A payload still
/// over budget after that is returned as is, with `validation.valid` false.
pub fn shrink_to_budget(
    profile: &ModelProfile,
    frames: Vec<ScoredFrame>,
    context: &CaptureContext,
    prompt_tokens: usize,
    max_attempts: usize,
) -> ShrinkOutcome {
    let mut frames = frames;
    let mut utilization = calculate_utilization(profile, &frames, context, prompt_tokens);
    let mut validation = validate(&utilization);
    let mut attempts = 0;

    while !validation.valid && attempts < max_attempts && frames.len() > MIN_FRAMES {
        let drop = if attempts == 0 {
            frames_over_budget(&utilization).max(1)
        } else {
            1
        };
        let target = frames.len().saturating_sub(drop).max(MIN_FRAMES);
        frames = evict_frames(&frames, target);
        attempts += 1;

        utilization = calculate_utilization(profile, &frames, context, prompt_tokens);
        validation = validate(&utilization);
        debug!(
            attempt = attempts,
            frames = frames.len(),
            utilization = utilization.utilization,
            "shrink round"
        );
    }

    if !validation.valid {
        warn!(
            frames = frames.len(),
            attempts,
            utilization = utilization.utilization,
            "payload still over budget after eviction"
        );
    }

    ShrinkOutcome {
        frames,
        utilization,
        validation,
        attempts,
    }
}
