use image::{GrayImage, RgbImage, imageops};
use imageproc::contrast::{ThresholdType, threshold};
use serde::{Deserialize, Serialize};

/// Derives a binary stand-in mask from a tile's grayscale intensity.
///
/// Pixels brighter than `threshold` are labelled vegetation (255), everything
/// else background (0). This is a bootstrap path for demos and smoke tests,
/// not ground truth: production training data is expected to come from real
/// annotations, and the fixed intensity cutoff should not be mistaken for a
/// labelling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSynthesizer {
    pub threshold: u8,
}

impl Default for MaskSynthesizer {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

impl MaskSynthesizer {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    /// Binary mask for a tile. Output dimensions equal the input's.
    pub fn synthesize(&self, tile: &RgbImage) -> GrayImage {
        let gray = imageops::grayscale(tile);
        threshold(&gray, self.threshold, ThresholdType::Binary)
    }
}
