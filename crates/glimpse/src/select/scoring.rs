//! Entropy and reasoning-value scoring.
//!
//! The entropy score is a cheap stand-in for "how much does this frame tell
//! the model". Frames near the start and end of a capture establish the
//! before/after state, the middle is where a failure usually unfolds, and a
//! large visual change since the previous frame means something happened.
//!
//! The reasoning value then adjusts that score for the target model: models
//! that weigh visual input heavily get higher values across the board, and
//! models asking for causal analysis favour mid-capture frames.

use crate::Frame;
use crate::budget::profile::{FocusLevel, ModelProfile};
use crate::select::diff::FrameDiffer;
use serde::{Deserialize, Serialize};

/// Entropy of a frame with no positional bonus and no visual change.
pub const BASE_ENTROPY: f64 = 0.5;
const EDGE_BONUS: f64 = 0.2;
const MIDDLE_BONUS: f64 = 0.1;
const MAX_CHANGE_BONUS: f64 = 0.3;
const CAUSAL_MIDDLE_BOOST: f64 = 1.2;

/// Where a frame sits in the capture.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FramePosition {
    Start,
    Middle,
    End,
}

impl FramePosition {
    /// Position of frame `index` in a capture of `total` frames.
    pub fn of(index: usize, total: usize) -> Self {
        if index == 0 {
            FramePosition::Start
        } else if index + 1 >= total {
            FramePosition::End
        } else {
            FramePosition::Middle
        }
    }
}

/// Entropy from temporal position and an already-computed diff percentage.
///
/// `change_pct` is `None` for the first frame, which has nothing to compare
/// against.
pub fn entropy_score(index: usize, total: usize, change_pct: Option<f64>) -> f64 {
    let mut score = BASE_ENTROPY;

    if total > 0 {
        let position = index as f64 / total as f64;
        if position < 0.1 {
            score += EDGE_BONUS;
        }
        if position > 0.9 {
            score += EDGE_BONUS;
        }
        if position > 0.4 && position < 0.6 {
            score += MIDDLE_BONUS;
        }
    }

    if let Some(pct) = change_pct {
        score += (pct / 100.0).clamp(0.0, MAX_CHANGE_BONUS);
    }

    score.clamp(0.0, 1.0)
}

/// Score a frame against its predecessor using `differ`.
pub fn score(
    frame: &Frame,
    prev: Option<&Frame>,
    total: usize,
    differ: &impl FrameDiffer,
) -> f64 {
    let change = prev.map(|p| differ.diff(p, frame));
    entropy_score(frame.index, total, change)
}

/// Adjust an entropy score for the target model.
pub fn reasoning_value(entropy: f64, position: FramePosition, profile: &ModelProfile) -> f64 {
    let visual_weight = 0.5 + profile.context_bias.visual;
    let causal = if position == FramePosition::Middle
        && profile.prompt_style.causal_focus_level == FocusLevel::High
    {
        CAUSAL_MIDDLE_BOOST
    } else {
        1.0
    };
    (entropy * visual_weight * causal).clamp(0.0, 1.0)
}

/// Eviction priority: the inverse of reasoning value, zero for anchors.
pub fn drop_priority(reasoning_value: f64, anchor: bool) -> f64 {
    if anchor {
        0.0
    } else {
        (1.0 - reasoning_value).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::profile::ProfileRegistry;

    fn profile_with(visual: f64, focus: FocusLevel) -> ModelProfile {
        let mut profile = ProfileRegistry::with_builtins().get_or_default("default").clone();
        profile.context_bias.visual = visual;
        profile.prompt_style.causal_focus_level = focus;
        profile
    }

    #[test]
    fn base_score_without_bonuses() {
        // 3/10 = 0.3: no position band.
        assert!((entropy_score(3, 10, None) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn first_frame_gets_edge_bonus() {
        assert!((entropy_score(0, 20, None) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn late_frame_gets_edge_bonus() {
        assert!((entropy_score(19, 20, None) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn middle_frame_gets_middle_bonus() {
        assert!((entropy_score(10, 20, None) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn change_bonus_is_capped() {
        assert!((entropy_score(3, 10, Some(10.0)) - 0.6).abs() < 1e-9);
        assert!((entropy_score(3, 10, Some(90.0)) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn score_is_clamped_to_one() {
        // Edge bonus + full change bonus would be 1.0 exactly; never above.
        let s = entropy_score(19, 20, Some(100.0));
        assert!(s <= 1.0);
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn score_uses_differ_for_previous_frame() {
        let a = Frame::new(2, "a", 2.0);
        let b = Frame::new(3, "b", 3.0);
        let differ = |_: &Frame, _: &Frame| 20.0;
        assert!((score(&b, Some(&a), 10, &differ) - 0.7).abs() < 1e-9);
        assert!((score(&b, None, 10, &differ) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn position_of_edges() {
        assert_eq!(FramePosition::of(0, 5), FramePosition::Start);
        assert_eq!(FramePosition::of(4, 5), FramePosition::End);
        assert_eq!(FramePosition::of(2, 5), FramePosition::Middle);
    }

    #[test]
    fn reasoning_value_scales_with_visual_bias() {
        let low = profile_with(0.2, FocusLevel::Low);
        let high = profile_with(0.5, FocusLevel::Low);
        let rv_low = reasoning_value(0.6, FramePosition::Middle, &low);
        let rv_high = reasoning_value(0.6, FramePosition::Middle, &high);
        assert!((rv_low - 0.42).abs() < 1e-9);
        assert!((rv_high - 0.6).abs() < 1e-9);
    }

    #[test]
    fn causal_focus_boosts_only_middle_frames() {
        let profile = profile_with(0.5, FocusLevel::High);
        assert!((reasoning_value(0.5, FramePosition::Middle, &profile) - 0.6).abs() < 1e-9);
        assert!((reasoning_value(0.5, FramePosition::Start, &profile) - 0.5).abs() < 1e-9);
        assert!((reasoning_value(0.5, FramePosition::End, &profile) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn reasoning_value_is_clamped() {
        let profile = profile_with(0.9, FocusLevel::High);
        assert_eq!(reasoning_value(1.0, FramePosition::Middle, &profile), 1.0);
    }

    #[test]
    fn anchors_have_zero_drop_priority() {
        assert_eq!(drop_priority(0.1, true), 0.0);
        assert!((drop_priority(0.25, false) - 0.75).abs() < 1e-9);
    }
}
