/// Pixel layout of a raw capture buffer as delivered by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Gray8,
    /// Packed 4:2:2, `Y0 U Y1 V` per pixel pair.
    Yuyv422,
    /// Planar luma followed by interleaved `U V` at quarter resolution.
    Nv12,
    /// One JPEG-compressed image per buffer.
    Mjpeg,
}

impl PixelFormat {
    /// Bytes the buffer must hold for the given dimensions, or `None` for
    /// compressed formats whose size is not known up front.
    pub fn expected_len(self, width: u32, height: u32) -> Option<usize> {
        let w = width as usize;
        let h = height as usize;
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => Some(w * h * 3),
            PixelFormat::Gray8 => Some(w * h),
            PixelFormat::Yuyv422 => Some(w.div_ceil(2) * 4 * h),
            PixelFormat::Nv12 => Some(w * h + w.div_ceil(2) * h.div_ceil(2) * 2),
            PixelFormat::Mjpeg => None,
        }
    }
}

/// A raw capture unit exactly as the device produced it.
///
/// Ownership moves from the frame source to the processor for a single tick;
/// nothing keeps a frame after its tick ends. The buffer is not validated
/// here: a malformed capture is detected when the frame is decoded.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    index: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat, index: u64) -> Self {
        Self {
            data,
            width,
            height,
            format,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Sequence number assigned by the source, starting at 0 per stream.
    pub fn index(&self) -> u64 {
        self.index
    }
}
