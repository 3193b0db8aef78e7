//! Key-frame selection: perceptual diffing, scoring, and the two selectors.
//!
//! - **[`diff`]** — [`FrameDiffer`] trait and the [`PerceptualDiff`] engine.
//!   Undecodable frames count as 100% changed.
//!
//! - **[`threshold`]** — greedy selection of the largest changes above a diff
//!   threshold, with evenly spaced fill for static captures.
//!
//! - **[`scoring`]** — entropy score, model-adjusted reasoning value, and drop
//!   priority.
//!
//! - **[`model_aware`]** — reasoning-value selection against a
//!   [`ModelProfile`](crate::budget::profile::ModelProfile), with temporal gap
//!   repair.
//!
//! Both selectors pin the first and last frame as anchors and return frames
//! in chronological order.

pub mod diff;
pub mod model_aware;
pub mod scoring;
pub mod threshold;

pub use diff::{FrameDiffer, PerceptualDiff};
pub use model_aware::select_model_aware;
pub use threshold::select_by_threshold;
