use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::capture::domain::frame_source::CaptureError;
use crate::shared::frame::Frame;

/// Hardware side of a frame source: enumerates devices and runs a producer
/// that pushes frames as the device delivers them.
pub trait CaptureDriver: Send {
    /// Number of devices this driver can open (indices `0..count`).
    fn device_count(&self) -> Result<u32, CaptureError>;

    /// Opens the device and starts producing frames on a background thread.
    ///
    /// Returns once the device is streaming, or with the error that kept it
    /// from streaming. The producer must exit promptly once `stop` is set or
    /// `feed` is disconnected. Frames are offered with `try_send`: a full feed
    /// means the consumer has not caught up and the frame is dropped.
    fn launch(
        &self,
        device_index: u32,
        feed: Sender<Frame>,
        stop: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, CaptureError>;
}
