//! Model-aware key-frame selection.
//!
//! Every frame is scored for entropy and reasoning value against the target
//! [`ModelProfile`]. The first and last frames are pinned as the baseline and
//! failure states and the highest-value interior frames fill the remaining
//! slots. A repair pass then plugs large holes in the timeline so the model
//! never has to guess what happened across a long unseen stretch.

use crate::budget::profile::ModelProfile;
use crate::select::diff::FrameDiffer;
use crate::select::scoring::{
    BASE_ENTROPY, FramePosition, drop_priority, entropy_score, reasoning_value,
};
use crate::{Frame, ScoredFrame};
use tracing::debug;

pub const BASELINE_REASON: &str = "baseline state";
pub const FINAL_REASON: &str = "final failure state";
pub const GAP_FILL_REASON: &str = "filling temporal gap";

/// A gap between consecutive selected frames larger than this fraction of
/// the capture gets a filler frame.
pub const TEMPORAL_GAP_FRACTION: f64 = 0.25;

/// Score every frame in `frames` against `profile`.
///
/// Anchors are not pinned here; callers decide which frames are anchors.
pub fn score_frames(
    frames: &[Frame],
    profile: &ModelProfile,
    differ: &impl FrameDiffer,
) -> Vec<ScoredFrame> {
    let total = frames.len();
    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let change = (i > 0).then(|| differ.diff(&frames[i - 1], frame));
            let entropy = entropy_score(frame.index, total, change);
            let value = reasoning_value(entropy, FramePosition::of(i, total), profile);

            let mut scored = ScoredFrame::new(frame.clone());
            scored.diff_score = change.unwrap_or(0.0);
            scored.entropy_score = entropy;
            scored.reasoning_value = value;
            scored.drop_priority = drop_priority(value, false);
            scored
        })
        .collect()
}

/// Reason text for an interior frame picked on merit.
pub fn candidate_reason(frame: &ScoredFrame) -> String {
    if frame.reasoning_value > 0.7 {
        format!(
            "high-entropy transition — {:.0}% information density",
            frame.reasoning_value * 100.0
        )
    } else if frame.entropy_score > BASE_ENTROPY {
        "state change detected".to_string()
    } else {
        "coverage frame".to_string()
    }
}

/// Select up to `target_count` frames in chronological order.
///
/// Interior frames are ranked by reasoning value (ties by index) and the top
/// `target_count - 2` join the two anchors. Gap repair only runs while the
/// selection is still short of the target.
///
/// A count below 2 is raised to 2 for captures with at least two frames.
pub fn select_model_aware(
    frames: &[Frame],
    profile: &ModelProfile,
    target_count: usize,
    differ: &impl FrameDiffer,
) -> Vec<ScoredFrame> {
    let scored = score_frames(frames, profile, differ);
    let total = scored.len();

    match total {
        0 => return Vec::new(),
        1 => return vec![scored[0].clone().pinned(BASELINE_REASON)],
        _ => {}
    }

    let target = target_count.max(2);
    let last = total - 1;

    let mut ranked: Vec<usize> = (1..last).collect();
    ranked.sort_by(|&a, &b| {
        scored[b]
            .reasoning_value
            .total_cmp(&scored[a].reasoning_value)
            .then(a.cmp(&b))
    });

    let mut selected: Vec<ScoredFrame> = Vec::with_capacity(target);
    selected.push(scored[0].clone().pinned(BASELINE_REASON));
    for &i in ranked.iter().take(target - 2) {
        selected.push(scored[i].clone().with_reason(candidate_reason(&scored[i])));
    }
    selected.push(scored[last].clone().pinned(FINAL_REASON));
    selected.sort_by_key(ScoredFrame::index);
    let on_merit = selected.len() - 2;

    let gap_fills = fill_temporal_gaps(&mut selected, &scored, target);

    debug!(
        frames = total,
        target,
        on_merit,
        gap_fills,
        model = %profile.name,
        "model-aware selection complete"
    );
    selected
}

/// Insert unselected frames into oversized gaps until none remain or the
/// selection reaches `target`. Returns the number of frames inserted.
///
/// `selected` must be chronological; `scored` is the full scored capture,
/// indexed by position.
fn fill_temporal_gaps(
    selected: &mut Vec<ScoredFrame>,
    scored: &[ScoredFrame],
    target: usize,
) -> usize {
    let max_gap = scored.len() as f64 * TEMPORAL_GAP_FRACTION;
    let mut filled = 0;

    while selected.len() < target {
        let fill = selected.windows(2).find_map(|pair| {
            let (a, b) = (pair[0].index(), pair[1].index());
            if (b - a) as f64 > max_gap {
                closest_to_midpoint(a, b)
            } else {
                None
            }
        });
        let Some(idx) = fill else {
            break;
        };

        let Some(source) = scored.iter().find(|f| f.index() == idx) else {
            break;
        };
        debug!(index = idx, "filling temporal gap");
        let pos = selected.partition_point(|f| f.index() < idx);
        selected.insert(pos, source.clone().with_reason(GAP_FILL_REASON));
        filled += 1;
    }

    filled
}

/// The index strictly between `a` and `b` nearest their midpoint, preferring
/// the earlier frame on ties.
fn closest_to_midpoint(a: usize, b: usize) -> Option<usize> {
    if b <= a + 1 {
        return None;
    }
    Some(a + (b - a) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::profile::{FocusLevel, ProfileRegistry};

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(i, format!("frame_{i:04}.png"), i as f64 * 0.5))
            .collect()
    }

    fn profile() -> ModelProfile {
        ProfileRegistry::with_builtins().get_or_default("claude").clone()
    }

    fn indices(frames: &[ScoredFrame]) -> Vec<usize> {
        frames.iter().map(|f| f.index()).collect()
    }

    #[test]
    fn anchors_are_first_and_last() {
        let input = frames(20);
        let result = select_model_aware(&input, &profile(), 6, &|_: &Frame, _: &Frame| 5.0);
        assert_eq!(result.first().unwrap().index(), 0);
        assert_eq!(result.last().unwrap().index(), 19);
        assert_eq!(result[0].reason, BASELINE_REASON);
        assert_eq!(result.last().unwrap().reason, FINAL_REASON);
        assert_eq!(result[0].drop_priority, 0.0);
        assert_eq!(result.last().unwrap().drop_priority, 0.0);
        assert!(result[0].anchor && result.last().unwrap().anchor);
    }

    #[test]
    fn never_exceeds_target_and_never_duplicates() {
        for n in [2, 3, 5, 9, 17, 40] {
            for target in [2, 3, 4, 6, 10] {
                let result =
                    select_model_aware(&frames(n), &profile(), target, &|_: &Frame, _: &Frame| 0.0);
                assert!(result.len() <= target.max(2), "n={n} target={target}");
                let idx = indices(&result);
                let mut sorted = idx.clone();
                sorted.sort();
                sorted.dedup();
                assert_eq!(sorted, idx, "chronological and unique for n={n} target={target}");
            }
        }
    }

    #[test]
    fn high_change_frames_are_preferred() {
        let differ = |_: &Frame, b: &Frame| if b.index == 7 { 80.0 } else { 0.0 };
        let result = select_model_aware(&frames(20), &profile(), 3, &differ);
        assert_eq!(indices(&result), vec![0, 7, 19]);
    }

    #[test]
    fn candidate_reasons_reflect_scores() {
        let mut frame = ScoredFrame::new(Frame::new(1, "f", 0.0));
        frame.reasoning_value = 0.84;
        frame.entropy_score = 0.7;
        assert_eq!(
            candidate_reason(&frame),
            "high-entropy transition — 84% information density"
        );
        frame.reasoning_value = 0.6;
        assert_eq!(candidate_reason(&frame), "state change detected");
        frame.entropy_score = 0.5;
        assert_eq!(candidate_reason(&frame), "coverage frame");
    }

    #[test]
    fn top_ranked_interior_frames_fill_the_slots() {
        let mut relaxed = profile();
        relaxed.prompt_style.causal_focus_level = FocusLevel::Low;
        let result = select_model_aware(&frames(20), &relaxed, 8, &|_: &Frame, _: &Frame| 0.0);
        // Frame 1 and the middle frames carry a bonus; 2 and 3 win the ties.
        assert_eq!(indices(&result), vec![0, 1, 2, 3, 9, 10, 11, 19]);
        assert!(result.iter().all(|f| f.reason != GAP_FILL_REASON));
        assert_eq!(result[1].reason, "state change detected");
        assert_eq!(result[2].reason, "coverage frame");
        assert_eq!(result[4].reason, "state change detected");
    }

    #[test]
    fn base_entropy_frames_still_compete() {
        let result = select_model_aware(&frames(20), &profile(), 12, &|_: &Frame, _: &Frame| 0.0);
        assert_eq!(result.len(), 12);
        assert!(result.iter().any(|f| f.reason == "coverage frame"));
    }

    #[test]
    fn gap_fill_respects_target() {
        let differ = |_: &Frame, b: &Frame| if b.index == 1 { 90.0 } else { 0.0 };
        let result = select_model_aware(&frames(40), &profile(), 3, &differ);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn gap_fill_picks_midpoint() {
        let mut selected = vec![
            ScoredFrame::new(Frame::new(0, "a", 0.0)).pinned(BASELINE_REASON),
            ScoredFrame::new(Frame::new(9, "b", 0.0)).pinned(FINAL_REASON),
        ];
        let scored: Vec<ScoredFrame> = frames(10).into_iter().map(ScoredFrame::new).collect();
        let filled = fill_temporal_gaps(&mut selected, &scored, 3);
        assert_eq!(filled, 1);
        assert_eq!(indices(&selected), vec![0, 4, 9]);
        assert_eq!(selected[1].reason, GAP_FILL_REASON);
        assert!(!selected[1].anchor);
    }

    #[test]
    fn short_captures_return_everything() {
        let result = select_model_aware(&frames(3), &profile(), 10, &|_: &Frame, _: &Frame| 0.0);
        assert_eq!(indices(&result), vec![0, 1, 2]);
    }

    #[test]
    fn single_and_empty_captures() {
        assert!(select_model_aware(&[], &profile(), 4, &|_: &Frame, _: &Frame| 0.0).is_empty());
        let one = select_model_aware(&frames(1), &profile(), 4, &|_: &Frame, _: &Frame| 0.0);
        assert_eq!(one.len(), 1);
        assert!(one[0].anchor);
    }

    #[test]
    fn causal_focus_lifts_middle_frames() {
        let mut focused = profile();
        focused.prompt_style.causal_focus_level = FocusLevel::High;
        let mut relaxed = focused.clone();
        relaxed.prompt_style.causal_focus_level = FocusLevel::Low;

        let input = frames(10);
        let differ = |_: &Frame, _: &Frame| 10.0;
        let a = score_frames(&input, &focused, &differ);
        let b = score_frames(&input, &relaxed, &differ);
        assert!(a[5].reasoning_value >= b[5].reasoning_value);
        assert!((a[0].reasoning_value - b[0].reasoning_value).abs() < 1e-9);
    }
}
