use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{BOX_COLOR, BOX_STROKE_WIDTH};
use crate::shared::image::ColorImage;

/// Outline style for face boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxStyle {
    pub stroke_width: u32,
    pub color: [u8; 3],
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            stroke_width: BOX_STROKE_WIDTH,
            color: BOX_COLOR,
        }
    }
}

/// Strokes each box outline onto the image and returns how many were drawn.
///
/// The stroke lies inside the box, so nothing outside a box's rectangle is
/// touched. Boxes that are empty or not fully inside the image are skipped.
pub fn stroke_boxes(image: &mut ColorImage, boxes: &[BoundingBox], style: &BoxStyle) -> usize {
    let (img_w, img_h) = (image.width(), image.height());
    let mut drawn = 0;
    for b in boxes {
        if !b.is_within(img_w, img_h) {
            continue;
        }
        stroke_one(image, b, style);
        drawn += 1;
    }
    drawn
}

fn stroke_one(image: &mut ColorImage, b: &BoundingBox, style: &BoxStyle) {
    let t = style.stroke_width as usize;
    let img_w = image.width() as usize;
    let (x0, y0) = (b.x as usize, b.y as usize);
    let (bw, bh) = (b.width as usize, b.height as usize);
    let data = image.data_mut();

    for row in 0..bh {
        let on_band = row < t || row + t >= bh;
        let y = y0 + row;
        for col in 0..bw {
            if on_band || col < t || col + t >= bw {
                let i = (y * img_w + x0 + col) * ColorImage::CHANNELS;
                data[i..i + ColorImage::CHANNELS].copy_from_slice(&style.color);
            }
        }
    }
}
