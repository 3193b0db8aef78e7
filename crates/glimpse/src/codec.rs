//! Frame optimization: what a selected frame costs once it is resized and
//! encoded for the target model.
//!
//! [`FrameCodec`] is the seam. [`PassthroughCodec`] leaves files alone and
//! charges the profile's per-image estimate. [`ResizingCodec`] actually
//! downsizes and re-encodes to JPEG at the allocated quality, charging tokens
//! in proportion to the pixels it kept.

use crate::ScoredFrame;
use crate::budget::allocation::{BudgetAllocation, REDUCED_QUALITY_COST};
use crate::budget::profile::ModelProfile;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A frame after optimization.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedFrame {
    pub locator: PathBuf,
    /// Encoded size on disk, 0 when unknown.
    pub bytes: u64,
    pub width: u32,
    pub height: u32,
    pub token_estimate: usize,
}

/// Turns a selected frame into what will actually be sent.
pub trait FrameCodec {
    fn optimize(&self, frame: &ScoredFrame, allocation: &BudgetAllocation) -> OptimizedFrame;
}

/// Token cost of one image at the allocated resolution.
fn allocated_image_tokens(image_tokens: usize, allocation: &BudgetAllocation) -> f64 {
    let base = image_tokens as f64;
    if allocation.quality_reduced() {
        base * REDUCED_QUALITY_COST
    } else {
        base
    }
}

/// Keeps original files, charging the profile's per-image estimate.
#[derive(Debug, Clone)]
pub struct PassthroughCodec {
    image_tokens: usize,
}

impl PassthroughCodec {
    pub fn new(image_tokens: usize) -> Self {
        Self { image_tokens }
    }

    pub fn for_profile(profile: &ModelProfile) -> Self {
        Self::new(profile.image_token_estimate)
    }
}

impl FrameCodec for PassthroughCodec {
    fn optimize(&self, frame: &ScoredFrame, allocation: &BudgetAllocation) -> OptimizedFrame {
        let locator = frame.frame.locator.clone();
        let bytes = std::fs::metadata(&locator).map_or(0, |m| m.len());
        let (width, height) = image::image_dimensions(&locator).unwrap_or_default();
        OptimizedFrame {
            locator,
            bytes,
            width,
            height,
            token_estimate: allocated_image_tokens(self.image_tokens, allocation).ceil() as usize,
        }
    }
}

/// Downsizes frames to the allocated resolution and re-encodes them as JPEG
/// into `out_dir`.
///
/// Frames are never upscaled. A frame that cannot be decoded or written is
/// passed through unchanged at full per-image cost.
#[derive(Debug, Clone)]
pub struct ResizingCodec {
    out_dir: PathBuf,
    image_tokens: usize,
}

impl ResizingCodec {
    pub fn new(out_dir: impl Into<PathBuf>, image_tokens: usize) -> Self {
        Self {
            out_dir: out_dir.into(),
            image_tokens,
        }
    }

    pub fn for_profile(out_dir: impl Into<PathBuf>, profile: &ModelProfile) -> Self {
        Self::new(out_dir, profile.image_token_estimate)
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn encode(
        &self,
        frame: &ScoredFrame,
        allocation: &BudgetAllocation,
    ) -> Result<OptimizedFrame, String> {
        let source = &frame.frame.locator;
        let img = image::open(source)
            .map_err(|e| format!("failed to decode {}: {e}", source.display()))?;

        let target = allocation.frame_resolution;
        let img = if img.width() > target.width || img.height() > target.height {
            img.resize(target.width, target.height, FilterType::Triangle)
        } else {
            img
        };
        let rgb = img.to_rgb8();

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, allocation.frame_quality)
            .encode_image(&rgb)
            .map_err(|e| format!("failed to encode frame {}: {e}", frame.index()))?;

        std::fs::create_dir_all(&self.out_dir)
            .map_err(|e| format!("failed to create {}: {e}", self.out_dir.display()))?;
        let locator = self.out_dir.join(format!("frame_{:04}.jpg", frame.index()));
        std::fs::write(&locator, &bytes)
            .map_err(|e| format!("failed to write {}: {e}", locator.display()))?;

        let full_area = f64::from(target.width) * f64::from(target.height);
        let area = f64::from(rgb.width()) * f64::from(rgb.height());
        let scale = if full_area > 0.0 {
            (area / full_area).min(1.0)
        } else {
            1.0
        };
        let token_estimate =
            (allocated_image_tokens(self.image_tokens, allocation) * scale).ceil() as usize;

        debug!(
            index = frame.index(),
            width = rgb.width(),
            height = rgb.height(),
            bytes = bytes.len(),
            token_estimate,
            "frame optimized"
        );
        Ok(OptimizedFrame {
            locator,
            bytes: bytes.len() as u64,
            width: rgb.width(),
            height: rgb.height(),
            token_estimate,
        })
    }
}

impl FrameCodec for ResizingCodec {
    fn optimize(&self, frame: &ScoredFrame, allocation: &BudgetAllocation) -> OptimizedFrame {
        match self.encode(frame, allocation) {
            Ok(optimized) => optimized,
            Err(e) => {
                warn!(
                    index = frame.index(),
                    error = %e,
                    "frame optimization failed, passing through"
                );
                PassthroughCodec::new(self.image_tokens).optimize(frame, allocation)
            }
        }
    }
}
