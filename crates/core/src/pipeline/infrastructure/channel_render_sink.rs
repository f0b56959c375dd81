use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::pipeline::render_sink::RenderSink;
use crate::shared::constants::DEFAULT_SURFACE_SIZE;
use crate::shared::image::ColorImage;

/// What the tick worker asks the UI thread to do.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderEvent {
    Frame { image: ColorImage, face_count: usize },
    Cleared,
    SignalLost,
    SignalRestored,
}

/// Forwards render calls to another thread over a bounded channel.
///
/// Sends never block the tick worker: when the receiver falls behind, the
/// event is dropped. The last presented image is kept for view capture.
pub struct ChannelRenderSink {
    tx: Sender<RenderEvent>,
    surface: (u32, u32),
    last_view: Mutex<Option<ColorImage>>,
}

impl ChannelRenderSink {
    pub fn new(capacity: usize, surface: (u32, u32)) -> (Self, Receiver<RenderEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        let sink = Self {
            tx,
            surface,
            last_view: Mutex::new(None),
        };
        (sink, rx)
    }

    pub fn with_default_surface(capacity: usize) -> (Self, Receiver<RenderEvent>) {
        Self::new(capacity, DEFAULT_SURFACE_SIZE)
    }

    fn send(&self, event: RenderEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::trace!("Render queue full, event dropped"),
            Err(TrySendError::Disconnected(_)) => log::trace!("Render receiver gone"),
        }
    }

    fn set_view(&self, view: Option<ColorImage>) {
        let mut guard = self.last_view.lock().unwrap_or_else(|p| p.into_inner());
        *guard = view;
    }
}

impl RenderSink for ChannelRenderSink {
    fn present(&self, image: ColorImage, face_count: usize) {
        self.set_view(Some(image.clone()));
        self.send(RenderEvent::Frame { image, face_count });
    }

    fn capture_current_view(&self) -> ColorImage {
        let guard = self.last_view.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_ref() {
            Some(view) => view.clone(),
            None => ColorImage::blank(self.surface.0, self.surface.1),
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    fn clear(&self) {
        self.set_view(None);
        self.send(RenderEvent::Cleared);
    }

    fn signal_lost(&self) {
        self.send(RenderEvent::SignalLost);
    }

    fn signal_restored(&self) {
        self.send(RenderEvent::SignalRestored);
    }
}
