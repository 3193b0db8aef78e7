//! Perceptual frame difference.
//!
//! Both images are decoded, shrunk to their common (smaller) dimensions, and
//! compared pixel by pixel. A pixel counts as changed when the summed
//! absolute R, G, B difference exceeds three times the per-channel threshold.
//! The result is the percentage of changed pixels.
//!
//! Decoding failures never propagate: an unreadable frame is reported as
//! 100% different so that selection errs toward including it.

use crate::Frame;
use image::DynamicImage;
use image::RgbImage;
use image::imageops::FilterType;
use tracing::{trace, warn};

/// Default per-channel threshold (0-255). The combined RGB threshold is
/// three times this.
pub const DEFAULT_CHANNEL_THRESHOLD: u8 = 25;

/// Difference reported when a frame cannot be decoded.
pub const MAX_DIFF_PERCENT: f64 = 100.0;

/// Anything that can say how different two frames are, as a percentage.
///
/// Implemented by [`PerceptualDiff`] and by any
/// `Fn(&Frame, &Frame) -> f64` closure.
pub trait FrameDiffer {
    fn diff(&self, a: &Frame, b: &Frame) -> f64;
}

impl<F> FrameDiffer for F
where
    F: Fn(&Frame, &Frame) -> f64,
{
    fn diff(&self, a: &Frame, b: &Frame) -> f64 {
        self(a, b)
    }
}

/// Pixel-difference engine backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct PerceptualDiff {
    channel_threshold: u8,
}

impl Default for PerceptualDiff {
    fn default() -> Self {
        Self {
            channel_threshold: DEFAULT_CHANNEL_THRESHOLD,
        }
    }
}

impl PerceptualDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the per-channel threshold.
    pub fn with_channel_threshold(mut self, threshold: u8) -> Self {
        self.channel_threshold = threshold;
        self
    }

    pub fn channel_threshold(&self) -> u8 {
        self.channel_threshold
    }

    /// Compare two already-decoded images.
    pub fn diff_images(&self, a: &DynamicImage, b: &DynamicImage) -> f64 {
        let width = a.width().min(b.width());
        let height = a.height().min(b.height());
        let total = width as u64 * height as u64;
        if total == 0 {
            return 0.0;
        }

        let a = fit_to(a, width, height);
        let b = fit_to(b, width, height);
        let limit = u32::from(self.channel_threshold) * 3;

        let changed = a
            .pixels()
            .zip(b.pixels())
            .filter(|(pa, pb)| {
                let sum: u32 = pa
                    .0
                    .iter()
                    .zip(pb.0.iter())
                    .map(|(x, y)| u32::from(x.abs_diff(*y)))
                    .sum();
                sum > limit
            })
            .count();

        100.0 * changed as f64 / total as f64
    }
}

impl FrameDiffer for PerceptualDiff {
    fn diff(&self, a: &Frame, b: &Frame) -> f64 {
        let (img_a, img_b) = match (decode(a), decode(b)) {
            (Ok(img_a), Ok(img_b)) => (img_a, img_b),
            (Err(e), _) | (_, Err(e)) => {
                warn!(
                    a = a.index,
                    b = b.index,
                    "treating frame pair as fully changed: {e}"
                );
                return MAX_DIFF_PERCENT;
            }
        };
        let pct = self.diff_images(&img_a, &img_b);
        trace!(a = a.index, b = b.index, pct, "frame diff");
        pct
    }
}

fn decode(frame: &Frame) -> Result<DynamicImage, String> {
    image::open(&frame.locator)
        .map_err(|e| format!("failed to decode {}: {e}", frame.locator.display()))
}

/// Convert to RGB at exactly `width`×`height`. Only ever shrinks.
fn fit_to(img: &DynamicImage, width: u32, height: u32) -> RgbImage {
    if img.width() == width && img.height() == height {
        img.to_rgb8()
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
            .to_rgb8()
    }
}
