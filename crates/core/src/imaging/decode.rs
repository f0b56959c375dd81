//! Raw capture buffer → `ColorImage` conversion.
//!
//! Every supported device layout ends up as RGB. YUV layouts use the integer
//! BT.601 studio-swing conversion; MJPEG goes through the `image` crate.

use thiserror::Error;

use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::image::ColorImage;

#[derive(Error, Debug)]
pub enum FrameDecodeError {
    #[error("frame has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("{format:?} frame of {width}x{height} needs {expected} bytes, got {actual}")]
    Truncated {
        format: PixelFormat,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("MJPEG frame could not be decoded: {0}")]
    Jpeg(#[source] image::ImageError),
}

/// Decodes a raw frame into an RGB color image.
///
/// Buffers longer than the declared geometry (row padding from some drivers)
/// are accepted; only the leading bytes are read.
pub fn decode(frame: &Frame) -> Result<ColorImage, FrameDecodeError> {
    let (w, h) = (frame.width(), frame.height());
    if w == 0 || h == 0 || frame.data().is_empty() {
        return Err(FrameDecodeError::Empty {
            width: w,
            height: h,
        });
    }

    if let Some(expected) = frame.format().expected_len(w, h) {
        if frame.data().len() < expected {
            return Err(FrameDecodeError::Truncated {
                format: frame.format(),
                width: w,
                height: h,
                expected,
                actual: frame.data().len(),
            });
        }
    }

    let data = frame.data();
    let image = match frame.format() {
        PixelFormat::Rgb24 => ColorImage::new(data[..rgb_len(w, h)].to_vec(), w, h),
        PixelFormat::Bgr24 => ColorImage::new(bgr_to_rgb(&data[..rgb_len(w, h)]), w, h),
        PixelFormat::Gray8 => ColorImage::new(gray_to_rgb(&data[..(w as usize) * (h as usize)]), w, h),
        PixelFormat::Yuyv422 => ColorImage::new(yuyv_to_rgb(data, w, h), w, h),
        PixelFormat::Nv12 => ColorImage::new(nv12_to_rgb(data, w, h), w, h),
        PixelFormat::Mjpeg => {
            let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
                .map_err(FrameDecodeError::Jpeg)?
                .to_rgb8();
            let (dw, dh) = decoded.dimensions();
            if dw == 0 || dh == 0 {
                return Err(FrameDecodeError::Empty {
                    width: dw,
                    height: dh,
                });
            }
            ColorImage::new(decoded.into_raw(), dw, dh)
        }
    };
    Ok(image)
}

fn rgb_len(w: u32, h: u32) -> usize {
    (w as usize) * (h as usize) * ColorImage::CHANNELS
}

fn bgr_to_rgb(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for px in data.chunks_exact(3) {
        out.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    out
}

fn gray_to_rgb(data: &[u8]) -> Vec<u8> {
    data.iter().flat_map(|&v| [v, v, v]).collect()
}

fn yuyv_to_rgb(data: &[u8], w: u32, h: u32) -> Vec<u8> {
    let (w, h) = (w as usize, h as usize);
    let stride = w.div_ceil(2) * 4;
    let mut out = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        for col in 0..w {
            let base = row * stride + (col / 2) * 4;
            let y = data[base + (col % 2) * 2];
            out.extend_from_slice(&yuv_to_rgb(y, data[base + 1], data[base + 3]));
        }
    }
    out
}

fn nv12_to_rgb(data: &[u8], w: u32, h: u32) -> Vec<u8> {
    let (w, h) = (w as usize, h as usize);
    let uv_plane = w * h;
    let uv_stride = w.div_ceil(2) * 2;
    let mut out = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        for col in 0..w {
            let uv = uv_plane + (row / 2) * uv_stride + (col / 2) * 2;
            out.extend_from_slice(&yuv_to_rgb(data[row * w + col], data[uv], data[uv + 1]));
        }
    }
    out
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;
    [clamp_u8(r), clamp_u8(g), clamp_u8(b)]
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn frame(data: Vec<u8>, w: u32, h: u32, format: PixelFormat) -> Frame {
        Frame::new(data, w, h, format, 0)
    }

    #[test]
    fn test_rgb_passthrough() {
        let data: Vec<u8> = (0..12).collect();
        let image = decode(&frame(data.clone(), 2, 2, PixelFormat::Rgb24)).unwrap();
        assert_eq!(image.data(), &data[..]);
        assert_eq!((image.width(), image.height()), (2, 2));
    }

    #[test]
    fn test_bgr_channels_swapped() {
        let image = decode(&frame(vec![10, 20, 30], 1, 1, PixelFormat::Bgr24)).unwrap();
        assert_eq!(image.pixel(0, 0), [30, 20, 10]);
    }

    #[test]
    fn test_gray_replicated() {
        let image = decode(&frame(vec![77, 5], 2, 1, PixelFormat::Gray8)).unwrap();
        assert_eq!(image.pixel(0, 0), [77, 77, 77]);
        assert_eq!(image.pixel(1, 0), [5, 5, 5]);
    }

    #[test]
    fn test_padded_buffer_uses_leading_bytes() {
        let mut data = vec![1u8; 12];
        data.extend_from_slice(&[9; 4]);
        let image = decode(&frame(data, 2, 2, PixelFormat::Rgb24)).unwrap();
        assert!(image.data().iter().all(|&b| b == 1));
    }

    #[rstest]
    #[case::white(235, [255, 255, 255])]
    #[case::black(16, [0, 0, 0])]
    fn test_yuyv_neutral_chroma(#[case] luma: u8, #[case] expected: [u8; 3]) {
        let data = vec![luma, 128, luma, 128];
        let image = decode(&frame(data, 2, 1, PixelFormat::Yuyv422)).unwrap();
        assert_eq!(image.pixel(0, 0), expected);
        assert_eq!(image.pixel(1, 0), expected);
    }

    #[test]
    fn test_yuyv_pair_shares_chroma_but_not_luma() {
        let data = vec![16, 128, 235, 128];
        let image = decode(&frame(data, 2, 1, PixelFormat::Yuyv422)).unwrap();
        assert_eq!(image.pixel(0, 0), [0, 0, 0]);
        assert_eq!(image.pixel(1, 0), [255, 255, 255]);
    }

    #[test]
    fn test_yuyv_strong_red_chroma() {
        // Y=81, U=90, V=240 is BT.601 red
        let image = decode(&frame(vec![81, 90, 81, 240], 2, 1, PixelFormat::Yuyv422)).unwrap();
        let [r, g, b] = image.pixel(0, 0);
        assert!(r > 240, "r = {r}");
        assert!(g < 10, "g = {g}");
        assert!(b < 10, "b = {b}");
    }

    #[test]
    fn test_nv12_neutral_chroma() {
        // 2x2 luma plane + one UV pair
        let data = vec![235, 235, 16, 16, 128, 128];
        let image = decode(&frame(data, 2, 2, PixelFormat::Nv12)).unwrap();
        assert_eq!(image.pixel(1, 0), [255, 255, 255]);
        assert_eq!(image.pixel(0, 1), [0, 0, 0]);
    }

    #[test]
    fn test_mjpeg_roundtrip_dimensions() {
        let source = image::RgbImage::from_pixel(8, 6, image::Rgb([200, 200, 200]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        source
            .write_to(&mut bytes, image::ImageFormat::Jpeg)
            .unwrap();
        let image = decode(&frame(bytes.into_inner(), 8, 6, PixelFormat::Mjpeg)).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
        let [r, _, _] = image.pixel(4, 3);
        assert!(r.abs_diff(200) < 8);
    }

    #[test]
    fn test_corrupt_mjpeg_is_error() {
        let result = decode(&frame(vec![0xFF, 0xD8, 0x00, 0x01], 8, 6, PixelFormat::Mjpeg));
        assert!(matches!(result, Err(FrameDecodeError::Jpeg(_))));
    }

    #[rstest]
    #[case::zero_width(0, 4)]
    #[case::zero_height(4, 0)]
    fn test_zero_dimension_is_empty(#[case] w: u32, #[case] h: u32) {
        let result = decode(&frame(vec![0; 48], w, h, PixelFormat::Rgb24));
        assert!(matches!(result, Err(FrameDecodeError::Empty { .. })));
    }

    #[test]
    fn test_empty_buffer_is_empty() {
        let result = decode(&frame(Vec::new(), 4, 4, PixelFormat::Mjpeg));
        assert!(matches!(result, Err(FrameDecodeError::Empty { .. })));
    }

    #[test]
    fn test_short_buffer_is_truncated() {
        let result = decode(&frame(vec![0; 10], 2, 2, PixelFormat::Bgr24));
        match result {
            Err(FrameDecodeError::Truncated {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 10);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }
}
