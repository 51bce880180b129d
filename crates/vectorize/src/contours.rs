use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::contrast::{ThresholdType, threshold};
use serde::{Deserialize, Serialize};

/// Clamps a grayscale mask to strict 0/255 values before tracing.
///
/// Prediction masks are re-thresholded even when they already look binary,
/// so the tracer never sees intermediate intensities from resampling or
/// lossy encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdBinarizer {
    pub threshold: u8,
}

impl Default for ThresholdBinarizer {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

impl ThresholdBinarizer {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn binarize(&self, mask: &GrayImage) -> GrayImage {
        threshold(mask, self.threshold, ThresholdType::Binary)
    }
}

/// Outer boundaries of the foreground regions in a binary mask, as ordered
/// point sequences in pixel coordinates `(col, row)`.
///
/// Interior (hole) borders are ignored, and boundaries with fewer than
/// three points cannot form a ring and are dropped.
pub fn extract_external_contours(binary: &GrayImage) -> Vec<Vec<(u32, u32)>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .map(|contour| {
            contour
                .points
                .into_iter()
                .map(|point| (point.x as u32, point.y as u32))
                .collect::<Vec<_>>()
        })
        .filter(|points| points.len() >= 3)
        .collect()
}
