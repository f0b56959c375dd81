//! Face locator backed by the SeetaFace funnel-structured cascade (`rustface`).
//!
//! The cascade scans an image pyramid with a sliding window and merges
//! overlapping candidates internally; this adapter only enforces the
//! locator contract on what comes back.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::detection::domain::detector_params::DetectorParams;
use crate::detection::domain::face_locator::{validate_input, DetectionError, FaceLocator};
use crate::shared::bounding_box::{BoundingBox, DEFAULT_IOU_THRESHOLD};
use crate::shared::detection_result::DetectionResult;
use crate::shared::image::GrayImage;

pub struct SeetaFaceLocator {
    model: rustface::Model,
    params: DetectorParams,
}

impl SeetaFaceLocator {
    /// Reads the model file once. Missing or malformed files fail with
    /// `ModelLoad`.
    pub fn load(model_path: &Path, params: DetectorParams) -> Result<Self, DetectionError> {
        params.validate()?;
        let load_error = |reason: String| DetectionError::ModelLoad {
            path: model_path.to_path_buf(),
            reason,
        };
        let file = File::open(model_path).map_err(|e| load_error(e.to_string()))?;
        let model =
            rustface::read_model(BufReader::new(file)).map_err(|e| load_error(e.to_string()))?;
        log::info!("Loaded face model from {}", model_path.display());
        Ok(Self { model, params })
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    fn build_detector(&self) -> Box<dyn rustface::Detector> {
        // A fresh detector per call keeps `detect` free of shared mutable state.
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.params.min_face_size);
        detector.set_score_thresh(self.params.score_threshold);
        detector.set_pyramid_scale_factor(self.params.pyramid_scale_factor);
        detector.set_slide_window_step(self.params.window_step_x, self.params.window_step_y);
        detector
    }
}

impl FaceLocator for SeetaFaceLocator {
    fn detect(&self, image: &GrayImage) -> Result<DetectionResult, DetectionError> {
        validate_input(image)?;
        let (w, h) = (image.width(), image.height());

        // Images smaller than the minimum window cannot contain a face.
        if w < self.params.min_face_size || h < self.params.min_face_size {
            return Ok(DetectionResult::empty(w, h));
        }

        let mut detector = self.build_detector();
        let faces = detector.detect(&rustface::ImageData::new(image.data(), w, h));

        let raw: Vec<BoundingBox> = faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                BoundingBox::new(bbox.x(), bbox.y(), bbox.width() as i32, bbox.height() as i32)
                    .clip_to(w, h)
            })
            .collect();

        Ok(DetectionResult::new(
            BoundingBox::deduplicate(&raw, DEFAULT_IOU_THRESHOLD),
            w,
            h,
        ))
    }
}
