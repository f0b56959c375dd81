//! Webcam capture through `nokhwa`'s native backend.
//!
//! The camera handle is created, used and dropped on its own thread; only
//! raw, undecoded buffers cross into the pipeline.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, TrySendError};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};

use crate::capture::domain::capture_driver::CaptureDriver;
use crate::capture::domain::frame_source::CaptureError;
use crate::shared::frame::{Frame, PixelFormat};

/// How long `launch` waits for the device to report it is streaming.
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Consecutive read failures after which the producer gives up, which
/// surfaces as `HardwareFault` on the next grab.
const MAX_READ_FAILURES: u32 = 30;

const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

/// How long a timed-out launch waits for its thread to notice `stop`.
const ABANDON_GRACE: Duration = Duration::from_secs(2);

pub struct NokhwaDriver {
    backend: ApiBackend,
}

impl NokhwaDriver {
    pub fn new() -> Self {
        Self {
            backend: ApiBackend::Auto,
        }
    }
}

impl Default for NokhwaDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDriver for NokhwaDriver {
    fn device_count(&self) -> Result<u32, CaptureError> {
        let devices = nokhwa::query(self.backend)
            .map_err(|e| CaptureError::HardwareFault(e.to_string()))?;
        for (i, info) in devices.iter().enumerate() {
            log::debug!("Camera {i}: {}", info.human_name());
        }
        Ok(devices.len() as u32)
    }

    fn launch(
        &self,
        device_index: u32,
        feed: Sender<Frame>,
        stop: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, CaptureError> {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let thread_stop = stop.clone();
        let handle = std::thread::Builder::new()
            .name(format!("camera-{device_index}"))
            .spawn(move || run_stream(device_index, feed, thread_stop, ready_tx))
            .map_err(|e| CaptureError::HardwareFault(e.to_string()))?;

        match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                stop.store(true, Ordering::Relaxed);
                reap_producer(handle, ABANDON_GRACE, device_index);
                Err(CaptureError::HardwareFault(format!(
                    "device {device_index} did not start streaming within {}s",
                    OPEN_TIMEOUT.as_secs()
                )))
            }
        }
    }
}

/// Joins a producer that was told to stop, waiting at most `grace`.
///
/// A thread still blocked inside the backend after that is left running
/// and reported; it releases the camera as soon as the backend returns.
/// Returns whether the thread was joined.
fn reap_producer(handle: JoinHandle<()>, grace: Duration, device_index: u32) -> bool {
    let deadline = std::time::Instant::now() + grace;
    while !handle.is_finished() {
        if std::time::Instant::now() >= deadline {
            log::warn!(
                "Camera {device_index} thread still blocked in the driver; \
                 the device may stay busy until it returns"
            );
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    if handle.join().is_err() {
        log::warn!("Camera {device_index} thread panicked while opening");
    }
    true
}

fn run_stream(
    device_index: u32,
    feed: Sender<Frame>,
    stop: Arc<AtomicBool>,
    ready: Sender<Result<(), CaptureError>>,
) {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let mut camera = match Camera::new(CameraIndex::Index(device_index), requested) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(map_open_error(device_index, e)));
            return;
        }
    };
    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(map_open_error(device_index, e)));
        return;
    }
    let _ = ready.send(Ok(()));

    let mut index = 0u64;
    let mut failures = 0u32;
    while !stop.load(Ordering::Relaxed) {
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                failures += 1;
                log::debug!("Read failed on camera {device_index}: {e}");
                if failures >= MAX_READ_FAILURES {
                    log::warn!("Camera {device_index} stopped delivering frames: {e}");
                    break;
                }
                std::thread::sleep(READ_RETRY_DELAY);
                continue;
            }
        };
        failures = 0;

        let Some(format) = pixel_format(buffer.source_frame_format()) else {
            log::warn!(
                "Camera {device_index} delivers unsupported format {:?}",
                buffer.source_frame_format()
            );
            break;
        };
        let resolution = buffer.resolution();
        let frame = Frame::new(
            buffer.buffer().to_vec(),
            resolution.width(),
            resolution.height(),
            format,
            index,
        );
        match feed.try_send(frame) {
            Ok(()) => index += 1,
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => break,
        }
    }

    if let Err(e) = camera.stop_stream() {
        log::warn!("Failed to release camera {device_index}: {e}");
    }
}

fn pixel_format(format: FrameFormat) -> Option<PixelFormat> {
    match format {
        FrameFormat::MJPEG => Some(PixelFormat::Mjpeg),
        FrameFormat::YUYV => Some(PixelFormat::Yuyv422),
        FrameFormat::NV12 => Some(PixelFormat::Nv12),
        FrameFormat::GRAY => Some(PixelFormat::Gray8),
        FrameFormat::RAWRGB => Some(PixelFormat::Rgb24),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn map_open_error(device_index: u32, error: NokhwaError) -> CaptureError {
    match error {
        NokhwaError::OpenDeviceError(..) | NokhwaError::OpenStreamError(..) => {
            CaptureError::DeviceBusy {
                index: device_index,
                reason: error.to_string(),
            }
        }
        other => CaptureError::HardwareFault(other.to_string()),
    }
}
