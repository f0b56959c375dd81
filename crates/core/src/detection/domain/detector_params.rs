use crate::detection::domain::face_locator::DetectionError;

/// Smallest face (in pixels) the cascade backend supports.
pub const MIN_SUPPORTED_FACE_SIZE: u32 = 20;

pub const DEFAULT_MIN_FACE_SIZE: u32 = 40;
pub const DEFAULT_SCORE_THRESHOLD: f64 = 2.0;
pub const DEFAULT_PYRAMID_SCALE_FACTOR: f32 = 0.8;
pub const DEFAULT_WINDOW_STEP: u32 = 4;

/// Pyramid scale range the cascade backend accepts.
pub const MIN_PYRAMID_SCALE_FACTOR: f32 = 0.01;
pub const MAX_PYRAMID_SCALE_FACTOR: f32 = 0.99;

/// Tunables of the multi-scale sliding-window search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorParams {
    pub min_face_size: u32,
    /// Classifier score a window must reach to count as a face.
    pub score_threshold: f64,
    /// Ratio between successive pyramid levels, in `[0.01, 0.99]`.
    pub pyramid_scale_factor: f32,
    pub window_step_x: u32,
    pub window_step_y: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            pyramid_scale_factor: DEFAULT_PYRAMID_SCALE_FACTOR,
            window_step_x: DEFAULT_WINDOW_STEP,
            window_step_y: DEFAULT_WINDOW_STEP,
        }
    }
}

impl DetectorParams {
    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.min_face_size < MIN_SUPPORTED_FACE_SIZE {
            return Err(DetectionError::InvalidParameter(format!(
                "min face size must be at least {MIN_SUPPORTED_FACE_SIZE}, got {}",
                self.min_face_size
            )));
        }
        if !(MIN_PYRAMID_SCALE_FACTOR..=MAX_PYRAMID_SCALE_FACTOR)
            .contains(&self.pyramid_scale_factor)
        {
            return Err(DetectionError::InvalidParameter(format!(
                "pyramid scale factor must be in [{MIN_PYRAMID_SCALE_FACTOR}, {MAX_PYRAMID_SCALE_FACTOR}], got {}",
                self.pyramid_scale_factor
            )));
        }
        if self.window_step_x == 0 || self.window_step_y == 0 {
            return Err(DetectionError::InvalidParameter(
                "sliding window step must be at least 1".into(),
            ));
        }
        if !(self.score_threshold.is_finite() && self.score_threshold > 0.0) {
            return Err(DetectionError::InvalidParameter(format!(
                "score threshold must be positive and finite, got {}",
                self.score_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DetectorParams::default().validate().is_ok());
    }

    #[rstest]
    #[case::face_too_small(DetectorParams { min_face_size: 19, ..Default::default() })]
    #[case::scale_zero(DetectorParams { pyramid_scale_factor: 0.0, ..Default::default() })]
    #[case::scale_one(DetectorParams { pyramid_scale_factor: 1.0, ..Default::default() })]
    #[case::zero_step_x(DetectorParams { window_step_x: 0, ..Default::default() })]
    #[case::zero_step_y(DetectorParams { window_step_y: 0, ..Default::default() })]
    #[case::nan_threshold(DetectorParams { score_threshold: f64::NAN, ..Default::default() })]
    #[case::zero_threshold(DetectorParams { score_threshold: 0.0, ..Default::default() })]
    #[case::negative_threshold(DetectorParams { score_threshold: -1.0, ..Default::default() })]
    #[case::scale_below_backend_range(DetectorParams { pyramid_scale_factor: 0.005, ..Default::default() })]
    #[case::scale_above_backend_range(DetectorParams { pyramid_scale_factor: 0.995, ..Default::default() })]
    fn test_invalid_params_rejected(#[case] params: DetectorParams) {
        assert!(matches!(
            params.validate(),
            Err(DetectionError::InvalidParameter(_))
        ));
    }

    #[rstest]
    #[case::scale_lower_bound(MIN_PYRAMID_SCALE_FACTOR)]
    #[case::scale_upper_bound(MAX_PYRAMID_SCALE_FACTOR)]
    fn test_scale_range_bounds_are_valid(#[case] pyramid_scale_factor: f32) {
        let params = DetectorParams {
            pyramid_scale_factor,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_minimum_supported_face_size_is_valid() {
        let params = DetectorParams {
            min_face_size: MIN_SUPPORTED_FACE_SIZE,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }
}
