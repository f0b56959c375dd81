pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;

/// Share of a box's area that may lie inside a kept box before it counts
/// as the same face.
pub const CONTAINMENT_THRESHOLD: f64 = 0.5;

/// Axis-aligned face box in pixel coordinates of the image it was found in.
///
/// Only meaningful relative to the color/gray pair of the same tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Non-empty and entirely inside `[0, image_w) x [0, image_h)`.
    pub fn is_within(&self, image_w: u32, image_h: u32) -> bool {
        self.width >= 1
            && self.height >= 1
            && self.x >= 0
            && self.y >= 0
            && (self.x as i64 + self.width as i64) <= image_w as i64
            && (self.y as i64 + self.height as i64) <= image_h as i64
    }

    /// Intersection with the image rectangle, or `None` if nothing remains.
    pub fn clip_to(&self, image_w: u32, image_h: u32) -> Option<BoundingBox> {
        let x1 = (self.x as i64).max(0);
        let y1 = (self.y as i64).max(0);
        let x2 = (self.x as i64 + self.width as i64).min(image_w as i64);
        let y2 = (self.y as i64 + self.height as i64).min(image_h as i64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(BoundingBox::new(
            x1 as i32,
            y1 as i32,
            (x2 - x1) as i32,
            (y2 - y1) as i32,
        ))
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> i64 {
        let ix1 = self.x.max(other.x) as i64;
        let iy1 = self.y.max(other.y) as i64;
        let ix2 = (self.x as i64 + self.width as i64).min(other.x as i64 + other.width as i64);
        let iy2 = (self.y as i64 + self.height as i64).min(other.y as i64 + other.height as i64);
        (ix2 - ix1).max(0) * (iy2 - iy1).max(0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let inter = self.intersection_area(other) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let area_a = self.area() as f64;
        let area_b = other.area() as f64;
        inter / (area_a + area_b - inter)
    }

    /// Intersection over the smaller of the two areas; 1.0 when one box
    /// lies entirely inside the other.
    pub fn containment(&self, other: &BoundingBox) -> f64 {
        let smaller = self.area().min(other.area());
        if smaller == 0 {
            return 0.0;
        }
        self.intersection_area(other) as f64 / smaller as f64
    }

    /// Greedy deduplication, largest boxes first: a box is dropped when its
    /// IoU with a kept box exceeds `iou_threshold` or when more than
    /// [`CONTAINMENT_THRESHOLD`] of it lies inside a kept box.
    pub fn deduplicate(boxes: &[BoundingBox], iou_threshold: f64) -> Vec<BoundingBox> {
        if boxes.len() <= 1 {
            return boxes.to_vec();
        }
        let mut ordered = boxes.to_vec();
        ordered.sort_by_key(|b| std::cmp::Reverse(b.area()));

        let mut kept: Vec<BoundingBox> = Vec::with_capacity(ordered.len());
        for b in ordered {
            let duplicate = kept
                .iter()
                .any(|k| b.iou(k) > iou_threshold || b.containment(k) > CONTAINMENT_THRESHOLD);
            if !duplicate {
                kept.push(b);
            }
        }
        kept
    }
}
