//! End-to-end planning over real image files.
//!
//! These tests write generated PNG frames to a temp directory and drive the
//! selectors and the planner with the perceptual differ, so decoding,
//! diffing, and encoding all run for real.

use std::path::Path;

use glimpse::prelude::*;
use glimpse::select::threshold::{END_REASON, START_REASON};
use image::{Rgb, RgbImage};

/// Helper: write `count` frames, black before `switch_at` and white from it.
fn write_capture(
    dir: &Path,
    count: usize,
    switch_at: usize,
    width: u32,
    height: u32,
) -> Vec<Frame> {
    (0..count)
        .map(|i| {
            let shade = if i < switch_at { 0 } else { 255 };
            let path = dir.join(format!("frame_{i:04}.png"));
            RgbImage::from_pixel(width, height, Rgb([shade, shade, shade]))
                .save(&path)
                .unwrap();
            Frame::new(i, path, i as f64 * 0.5)
        })
        .collect()
}

fn indices(frames: &[ScoredFrame]) -> Vec<usize> {
    frames.iter().map(|f| f.index()).collect()
}

// ── Selection ────────────────────────────────────────────────────────

#[test]
fn threshold_selection_finds_the_visual_change() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_capture(dir.path(), 12, 5, 64, 48);

    let result = select_by_threshold(&frames, 3, 3.0, &PerceptualDiff::new());
    assert_eq!(indices(&result.selected), vec![0, 5, 11]);
    assert_eq!(result.reasons, vec![START_REASON, "major UI update", END_REASON]);
    assert_eq!(result.selected[1].diff_score, 100.0);
    assert_eq!(result.total_extracted, 12);
}

#[test]
fn static_capture_is_spread_evenly() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_capture(dir.path(), 10, 10, 32, 32);

    let result = select_by_threshold(&frames, 6, 3.0, &PerceptualDiff::new());
    assert_eq!(result.selected.len(), 6);
    assert_eq!(result.selected.first().unwrap().index(), 0);
    assert_eq!(result.selected.last().unwrap().index(), 9);
}

// ── Planning ─────────────────────────────────────────────────────────

#[test]
fn model_aware_plan_keeps_the_change_and_the_anchors() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_capture(dir.path(), 12, 5, 64, 48);
    let registry = ProfileRegistry::with_builtins();
    let profile = registry.get_or_default("gpt-4o");

    let plan = CapturePlanner::new(profile, PlannerConfig::default()).plan(
        &frames,
        &CaptureContext::default(),
        &PerceptualDiff::new(),
        &PassthroughCodec::for_profile(profile),
    );

    let kept = indices(&plan.frames);
    assert_eq!(kept.len(), profile.preferred_frames);
    assert_eq!(kept.first(), Some(&0));
    assert_eq!(kept.last(), Some(&11));
    assert!(kept.contains(&5), "{kept:?}");
    assert!(plan.validation.valid);

    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["model"], "gpt-4o");
    assert_eq!(json["strategy"], "model-aware");
    assert!(json["frames"][0]["timestampSecs"].is_number());
}

#[test]
fn resizing_codec_writes_optimized_frames() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("optimized");
    let frames = write_capture(dir.path(), 4, 2, 1600, 900);
    let registry = ProfileRegistry::with_builtins();
    let profile = registry.get_or_default("claude");

    let plan = CapturePlanner::new(profile, PlannerConfig::default()).plan(
        &frames,
        &CaptureContext::default(),
        &PerceptualDiff::new(),
        &ResizingCodec::for_profile(&out_dir, profile),
    );

    assert_eq!(plan.frames.len(), 4);
    for frame in &plan.frames {
        let optimized = frame.optimized_locator.as_deref().unwrap();
        assert!(optimized.starts_with(&out_dir));
        assert_eq!(frame.output_locator(), optimized);
        assert_eq!(image::image_dimensions(optimized).unwrap(), (1280, 720));
        assert_eq!(frame.token_estimate, profile.image_token_estimate);
    }
}

#[test]
fn custom_profile_and_context_files_drive_trimming() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_capture(dir.path(), 8, 4, 32, 32);

    let profiles_path = dir.path().join("profiles.json");
    let profiles = serde_json::json!([{
        "name": "tiny",
        "maxTokens": 2000,
        "imageTokenEstimate": 100,
        "preferredFrames": 4,
        "maxFrames": 6,
        "contextBias": {"visual": 0.4, "code": 0.3, "execution": 0.3},
        "promptStyle": {
            "verbosity": "concise",
            "includeTimestamps": false,
            "includeFrameReasons": false,
            "structuredSections": false,
            "requestCausalChain": false,
            "causalFocusLevel": "low"
        }
    }]);
    std::fs::write(&profiles_path, profiles.to_string()).unwrap();

    let diff: String = (0..80).map(|i| format!("+added line {i}\n")).collect();
    let context_path = dir.path().join("context.json");
    let context = serde_json::json!({
        "terminal": {
            "recentOutput": (0..200).map(|i| format!("output {i}")).collect::<Vec<_>>(),
            "errors": ["error[E0308]: mismatched types"],
            "tokenEstimate": 2500
        },
        "git": {
            "branch": "fix/login",
            "recentCommits": ["a1b2c3 wip"],
            "diff": diff,
            "tokenEstimate": 700
        }
    });
    std::fs::write(&context_path, context.to_string()).unwrap();

    let mut registry = ProfileRegistry::with_builtins();
    assert_eq!(registry.load_file(&profiles_path).unwrap(), 1);
    let profile = registry.get_or_default("tiny");
    let context = CaptureContext::load(&context_path).unwrap();

    let plan = CapturePlanner::new(profile, PlannerConfig::new().with_prompt_tokens(0)).plan(
        &frames,
        &context,
        &PerceptualDiff::new(),
        &PassthroughCodec::for_profile(profile),
    );

    assert_eq!(plan.allocation.frame_count, 4);
    assert!(!plan.allocation.include_full_diff);
    let trimmed_diff = plan.context.git.diff.as_deref().unwrap();
    assert!(trimmed_diff.contains("(Full diff omitted — 80 lines)"));
    assert!(plan.context.git.token_estimate <= 200);
    assert_eq!(plan.context.terminal.errors.len(), 1);
    assert!(plan.context.terminal.token_estimate <= 400);
    assert!(plan.context.terminal.recent_output.len() < 200);
    assert_eq!(
        plan.utilization.text,
        plan.context.terminal.token_estimate + plan.context.git.token_estimate
    );
}

#[test]
fn unreadable_frames_degrade_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let mut frames = write_capture(dir.path(), 6, 6, 16, 16);
    frames[3].locator = dir.path().join("missing.png");

    let result = select_by_threshold(&frames, 3, 3.0, &PerceptualDiff::new());
    assert_eq!(result.selected.len(), 3);
    // The missing frame reads as a total change and wins the free slot.
    assert_eq!(indices(&result.selected), vec![0, 3, 5]);
}
