use image::imageops::FilterType;

use crate::shared::image::{ColorImage, GrayImage};

/// Fixed-point BT.601 luma weights scaled by 2^14 (R, G, B).
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

/// Mirrors the image around its vertical axis in place (`x' = width - 1 - x`).
pub fn mirror_horizontal(image: &mut ColorImage) {
    let channels = ColorImage::CHANNELS;
    let mut view = image.as_ndarray_mut();
    for mut row in view.outer_iter_mut() {
        let w = row.shape()[0];
        for x in 0..w / 2 {
            for c in 0..channels {
                row.swap([x, c], [w - 1 - x, c]);
            }
        }
    }
}

/// Perceptual luminance reduction, `0.299 R + 0.587 G + 0.114 B` rounded.
pub fn to_grayscale(image: &ColorImage) -> GrayImage {
    let data = image
        .data()
        .chunks_exact(ColorImage::CHANNELS)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect();
    GrayImage::new(data, image.width(), image.height())
}

/// Scales to exactly `width` x `height` with bilinear filtering.
///
/// Returns a clone when the size already matches, and a blank image when
/// either side is empty.
pub fn scale_to(image: &ColorImage, width: u32, height: u32) -> ColorImage {
    if image.width() == width && image.height() == height {
        return image.clone();
    }
    if image.is_empty() || width == 0 || height == 0 {
        return ColorImage::blank(width, height);
    }
    let Some(buffer) =
        image::RgbImage::from_raw(image.width(), image.height(), image.data().to_vec())
    else {
        return ColorImage::blank(width, height);
    };
    let scaled = image::imageops::resize(&buffer, width, height, FilterType::Triangle);
    ColorImage::new(scaled.into_raw(), width, height)
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B;
    ((weighted + LUMA_ROUND) >> LUMA_SHIFT).min(255) as u8
}
