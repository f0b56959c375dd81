use std::path::PathBuf;

use thiserror::Error;

use crate::imaging::annotate::{stroke_boxes, BoxStyle};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::detection_result::DetectionResult;
use crate::shared::image::{ColorImage, GrayImage};

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("failed to load detection model from {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },
    #[error("invalid detection input: {0}")]
    InvalidInput(String),
    #[error("invalid detector parameter: {0}")]
    InvalidParameter(String),
}

/// Domain interface for locating faces in a grayscale image.
///
/// Implementations hold a model that is read-only once constructed, so
/// `detect` takes `&self` and may be shared across threads.
pub trait FaceLocator: Send + Sync {
    /// Returns one box per face, each non-empty and fully inside `image`.
    /// No box duplicates another: none overlaps a kept box by IoU above
    /// 0.3 or lies mostly inside it.
    ///
    /// Fails with `InvalidInput` for an empty or non-single-channel image.
    /// The same image and parameters always yield the same result.
    fn detect(&self, image: &GrayImage) -> Result<DetectionResult, DetectionError>;

    /// Outlines `boxes` on `image`, silently skipping any that do not fit.
    fn draw_boxes(&self, image: &mut ColorImage, boxes: &[BoundingBox]) {
        stroke_boxes(image, boxes, &BoxStyle::default());
    }
}

/// Shared input check for `FaceLocator::detect` implementations.
pub fn validate_input(image: &GrayImage) -> Result<(), DetectionError> {
    if image.is_empty() {
        return Err(DetectionError::InvalidInput(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    if !image.is_single_channel() {
        return Err(DetectionError::InvalidInput(format!(
            "expected {} single-channel bytes for {}x{}, got {}",
            image.width() as usize * image.height() as usize,
            image.width(),
            image.height(),
            image.data().len()
        )));
    }
    Ok(())
}
