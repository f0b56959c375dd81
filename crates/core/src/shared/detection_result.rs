use crate::shared::bounding_box::BoundingBox;

/// Faces found in one tick's image, together with that image's size.
///
/// Box order carries no meaning; the count is what gets displayed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub boxes: Vec<BoundingBox>,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl DetectionResult {
    pub fn new(boxes: Vec<BoundingBox>, frame_width: u32, frame_height: u32) -> Self {
        Self {
            boxes,
            frame_width,
            frame_height,
        }
    }

    pub fn empty(frame_width: u32, frame_height: u32) -> Self {
        Self::new(Vec::new(), frame_width, frame_height)
    }

    pub fn face_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}
