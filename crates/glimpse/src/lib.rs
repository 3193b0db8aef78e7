//! Token-budgeted key-frame and context selection for LLM debugging captures.
//!
//! A screen capture of a failing workflow produces dozens of frames plus a
//! pile of terminal output and git state. A reasoning model can only look at
//! a bounded slice of that. `glimpse` decides which slice: it scores frames by
//! how much they change and where they sit in time, splits a model's token
//! window across visual, code, and execution signals, and trims frames and
//! text until the payload fits.
//!
//! Everything in the core is a pure, synchronous transformation over value
//! types. The only I/O is decoding two images when computing a perceptual
//! difference, and that degrades to "maximally different" on failure.
//!
//! # Getting started
//!
//! ```ignore
//! use glimpse::prelude::*;
//!
//! let registry = ProfileRegistry::with_builtins();
//! let profile = registry.get_or_default("claude");
//!
//! let plan = CapturePlanner::new(profile, PlannerConfig::default()).plan(
//!     &frames,
//!     &context,
//!     &PerceptualDiff::new(),
//!     &PassthroughCodec::for_profile(profile),
//! );
//!
//! println!("{}", plan.utilization.to_table());
//! ```
//!
//! # Where to find things
//!
//! - **Compare two frames:** [`select::diff::PerceptualDiff`] implements the
//!   [`FrameDiffer`](select::diff::FrameDiffer) trait. Closures implement it
//!   too, which is handy for tests.
//!
//! - **Pick key frames:** [`select::threshold`] for the diff-threshold greedy
//!   selector, [`select::model_aware`] for the entropy/reasoning-value
//!   selector with temporal gap repair. Scoring lives in [`select::scoring`].
//!
//! - **Split a token budget:** [`budget::allocation::allocate`] turns a
//!   [`ModelProfile`](budget::profile::ModelProfile) into a
//!   [`BudgetAllocation`](budget::allocation::BudgetAllocation). Profiles come
//!   from a [`ProfileRegistry`](budget::profile::ProfileRegistry).
//!
//! - **Measure and enforce the budget:** [`budget::utilization`] for
//!   accounting and validation, [`context::eviction`] for frame eviction and
//!   the bounded shrink loop, [`context::trim`] for terminal/git trimming.
//!
//! - **Do all of it at once:** [`planner::CapturePlanner`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`select`] | Perceptual diff, threshold selector, entropy scoring, model-aware selector |
//! | [`budget`] | Model profiles, budget allocation, utilization and validation |
//! | [`context`] | Capture context types, trimming, frame eviction |
//! | [`codec`] | Frame optimization seam and the built-in codecs |
//! | [`planner`] | End-to-end capture planning |

pub mod budget;
pub mod codec;
pub mod config;
pub mod context;
pub mod planner;
pub mod prelude;
pub mod select;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ── Constants ──────────────────────────────────────────────────────

/// Characters per token used for every text estimate in the crate.
pub const CHARS_PER_TOKEN: f64 = 4.0;

/// Estimate the token cost of a piece of text (4 characters ≈ 1 token).
pub fn estimate_text_tokens(text: &str) -> usize {
    (text.chars().count() as f64 / CHARS_PER_TOKEN).ceil() as usize
}

// ── Frame types ────────────────────────────────────────────────────

/// A raw captured frame. Produced externally, never modified here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Position in the extracted sequence, starting at 0.
    pub index: usize,
    /// Where the frame's image lives. Opaque to everything but the differ
    /// and the codec.
    pub locator: PathBuf,
    /// Capture time relative to the start of the recording.
    pub timestamp_secs: f64,
}

impl Frame {
    pub fn new(index: usize, locator: impl Into<PathBuf>, timestamp_secs: f64) -> Self {
        Self {
            index,
            locator: locator.into(),
            timestamp_secs,
        }
    }
}

/// A frame that survived selection, annotated with why it was chosen and
/// how expensive it is to keep.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ScoredFrame {
    #[serde(flatten)]
    pub frame: Frame,
    /// Percentage of pixels that changed relative to the previous frame.
    pub diff_score: f64,
    /// Human-readable selection reason.
    pub reason: String,
    /// Heuristic information content in `[0, 1]`.
    pub entropy_score: f64,
    /// Entropy adjusted for the target model, in `[0, 1]`.
    pub reasoning_value: f64,
    /// Eviction order under budget pressure. Lower is kept longer.
    pub drop_priority: f64,
    /// First or last frame of the capture. Never evicted.
    pub anchor: bool,
    /// Token cost once the codec has optimized the frame.
    pub token_estimate: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized_locator: Option<PathBuf>,
}

/// Neutral drop priority for frames that were never scored.
const UNSCORED_DROP_PRIORITY: f64 = 0.5;

impl ScoredFrame {
    /// Wrap a raw frame with neutral scores.
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            diff_score: 0.0,
            reason: String::new(),
            entropy_score: 0.0,
            reasoning_value: 0.0,
            drop_priority: UNSCORED_DROP_PRIORITY,
            anchor: false,
            token_estimate: 0,
            optimized_locator: None,
        }
    }

    pub fn index(&self) -> usize {
        self.frame.index
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Mark this frame as a capture anchor: never evicted, priority 0.
    pub fn pinned(mut self, reason: impl Into<String>) -> Self {
        self.anchor = true;
        self.drop_priority = 0.0;
        self.reason = reason.into();
        self
    }

    /// Location to hand to the formatter: the optimized copy if there is one.
    pub fn output_locator(&self) -> &Path {
        self.optimized_locator
            .as_deref()
            .unwrap_or(&self.frame.locator)
    }
}

/// Output of the threshold selector.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FrameSelectionResult {
    /// Chosen frames in chronological order.
    pub selected: Vec<ScoredFrame>,
    /// Number of frames the selector was offered.
    pub total_extracted: usize,
    /// Selection reason per chosen frame, same order as `selected`.
    pub reasons: Vec<String>,
}
