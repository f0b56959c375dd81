use std::sync::{Mutex, MutexGuard};

use crate::imaging::transform::scale_to;
use crate::pipeline::render_sink::RenderSink;
use crate::shared::constants::DEFAULT_SURFACE_SIZE;
use crate::shared::image::ColorImage;

/// In-memory display surface.
///
/// Presented frames are scaled to the surface size, so the captured view is
/// exactly what a panel of that size would show.
pub struct FrameBufferSink {
    state: Mutex<SurfaceState>,
}

struct SurfaceState {
    size: (u32, u32),
    view: Option<ColorImage>,
    face_count: usize,
    has_signal: bool,
    presented: u64,
}

impl FrameBufferSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                size: (width, height),
                view: None,
                face_count: 0,
                has_signal: true,
                presented: 0,
            }),
        }
    }

    /// Changes the surface size. The current view is rescaled on next capture.
    pub fn resize(&self, width: u32, height: u32) {
        self.lock().size = (width, height);
    }

    pub fn face_count(&self) -> usize {
        self.lock().face_count
    }

    pub fn has_signal(&self) -> bool {
        self.lock().has_signal
    }

    pub fn presented_count(&self) -> u64 {
        self.lock().presented
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for FrameBufferSink {
    fn default() -> Self {
        let (w, h) = DEFAULT_SURFACE_SIZE;
        Self::new(w, h)
    }
}

impl RenderSink for FrameBufferSink {
    fn present(&self, image: ColorImage, face_count: usize) {
        let mut state = self.lock();
        let (w, h) = state.size;
        state.view = Some(scale_to(&image, w, h));
        state.face_count = face_count;
        state.presented += 1;
    }

    fn capture_current_view(&self) -> ColorImage {
        let state = self.lock();
        let (w, h) = state.size;
        match &state.view {
            Some(view) => scale_to(view, w, h),
            None => ColorImage::blank(w, h),
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        self.lock().size
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.view = None;
        state.face_count = 0;
    }

    fn signal_lost(&self) {
        self.lock().has_signal = false;
    }

    fn signal_restored(&self) {
        self.lock().has_signal = true;
    }
}
