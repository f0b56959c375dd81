use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, TrySendError};

use crate::capture::domain::capture_driver::CaptureDriver;
use crate::capture::domain::frame_source::CaptureError;
use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::image::ColorImage;

/// Capture driver that replays one still image as a single-device camera.
///
/// Each delivery waits one `interval` first, so a freshly started stream
/// has no frame ready, just like a camera warming up.
pub struct StillImageDriver {
    image: Arc<ColorImage>,
    interval: Duration,
}

impl StillImageDriver {
    pub fn new(image: ColorImage, interval: Duration) -> Self {
        Self {
            image: Arc::new(image),
            interval,
        }
    }

    /// Decodes an image file (PNG or JPEG) up front.
    pub fn open_file(path: &Path, interval: Duration) -> Result<Self, Box<dyn std::error::Error>> {
        let img = image::open(path)?.to_rgb8();
        let (w, h) = img.dimensions();
        log::info!("Replaying {} ({w}x{h}) as device 0", path.display());
        Ok(Self::new(ColorImage::new(img.into_raw(), w, h), interval))
    }
}

impl CaptureDriver for StillImageDriver {
    fn device_count(&self) -> Result<u32, CaptureError> {
        Ok(1)
    }

    fn launch(
        &self,
        device_index: u32,
        feed: Sender<Frame>,
        stop: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, CaptureError> {
        if device_index != 0 {
            return Err(CaptureError::DeviceUnavailable(device_index));
        }
        let image = self.image.clone();
        let interval = self.interval;
        std::thread::Builder::new()
            .name("still-image-capture".into())
            .spawn(move || {
                let mut index = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    std::thread::sleep(interval);
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let frame = Frame::new(
                        image.data().to_vec(),
                        image.width(),
                        image.height(),
                        PixelFormat::Rgb24,
                        index,
                    );
                    match feed.try_send(frame) {
                        Ok(()) => index += 1,
                        Err(TrySendError::Full(_)) => {}
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
            })
            .map_err(|e| CaptureError::HardwareFault(e.to_string()))
    }
}
