//! Greedy key-frame selection by diff threshold.
//!
//! The first and last frames are always kept. Interior frames are ranked by
//! how much they differ from their predecessor, and the biggest changes above
//! the threshold win. When a capture is too static to fill the requested
//! count, the remaining slots are spread evenly across the timeline.

use crate::select::diff::FrameDiffer;
use crate::select::scoring::drop_priority;
use crate::{Frame, FrameSelectionResult, ScoredFrame};
use std::collections::BTreeSet;
use tracing::debug;

pub const START_REASON: &str = "start of capture";
pub const END_REASON: &str = "end of capture";

/// Human-readable bucket for a diff percentage.
pub fn reason_for_diff(diff_pct: f64) -> &'static str {
    if diff_pct >= 20.0 {
        "major UI update"
    } else if diff_pct >= 10.0 {
        "significant change"
    } else if diff_pct >= 5.0 {
        "content update"
    } else {
        "minor change"
    }
}

/// Select up to `target_count` frames, preferring interior frames whose diff
/// from the previous frame is at least `diff_threshold` percent.
///
/// A count below 2 is raised to 2: the anchors are never dropped. Captures
/// that fit the raised count come back whole.
pub fn select_by_threshold(
    frames: &[Frame],
    target_count: usize,
    diff_threshold: f64,
    differ: &impl FrameDiffer,
) -> FrameSelectionResult {
    let total = frames.len();
    let target = target_count.max(2);

    if total <= target {
        debug!(frames = total, target, "keeping every frame");
        return into_result(keep_all(frames), total);
    }

    let last = total - 1;
    let slots = target - 2;

    // diffs[i] is the change from frame i-1 to frame i; anchors stay at 0.
    let mut diffs = vec![0.0; total];
    for i in 1..last {
        diffs[i] = differ.diff(&frames[i - 1], &frames[i]);
    }

    let mut candidates: Vec<usize> = (1..last).filter(|&i| diffs[i] >= diff_threshold).collect();
    candidates.sort_by(|&a, &b| diffs[b].total_cmp(&diffs[a]).then(a.cmp(&b)));
    candidates.truncate(slots);

    let above_threshold = candidates.len();
    let mut chosen: BTreeSet<usize> = candidates.into_iter().collect();

    if chosen.len() < slots {
        let remaining = slots - chosen.len();
        let step = (total / (remaining + 1)).max(1);
        let mut idx = step;
        while chosen.len() < slots && idx < last {
            chosen.insert(idx);
            idx += step;
        }
        // Evenly spaced picks can land on frames already chosen.
        for idx in 1..last {
            if chosen.len() >= slots {
                break;
            }
            chosen.insert(idx);
        }
        debug!(
            above_threshold,
            filled = chosen.len() - above_threshold,
            step,
            "too few frames above diff threshold, filled evenly"
        );
    }

    let mut selected = Vec::with_capacity(target);
    selected.push(ScoredFrame::new(frames[0].clone()).pinned(START_REASON));
    for idx in chosen {
        let diff = diffs[idx];
        let mut frame = ScoredFrame::new(frames[idx].clone()).with_reason(reason_for_diff(diff));
        frame.diff_score = diff;
        frame.drop_priority = drop_priority(diff / 100.0, false);
        selected.push(frame);
    }
    selected.push(ScoredFrame::new(frames[last].clone()).pinned(END_REASON));

    debug!(
        frames = total,
        selected = selected.len(),
        threshold = diff_threshold,
        "threshold selection complete"
    );
    into_result(selected, total)
}

fn keep_all(frames: &[Frame]) -> Vec<ScoredFrame> {
    let last = frames.len().saturating_sub(1);
    frames
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let frame = ScoredFrame::new(f.clone());
            if i == 0 {
                frame.pinned("start")
            } else if i == last {
                frame.pinned("end")
            } else {
                frame.with_reason("selected frame")
            }
        })
        .collect()
}

fn into_result(selected: Vec<ScoredFrame>, total_extracted: usize) -> FrameSelectionResult {
    let reasons = selected.iter().map(|f| f.reason.clone()).collect();
    FrameSelectionResult {
        selected,
        total_extracted,
        reasons,
    }
}
