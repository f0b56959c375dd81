use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no capture device at index {0}")]
    DeviceUnavailable(u32),
    #[error("capture device {index} is busy: {reason}")]
    DeviceBusy { index: u32, reason: String },
    #[error("capture hardware fault: {0}")]
    HardwareFault(String),
    #[error("capture is not running")]
    NotRunning,
}

/// Lifecycle of a frame source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Running,
}

/// Domain interface for a single capture device.
///
/// Implementations own the device handle exclusively; `start`/`stop` acquire
/// and release it.
pub trait FrameSource: Send {
    /// Binds the source to a device. Re-opening while bound is a no-op.
    fn open(&mut self, device_index: u32) -> Result<(), CaptureError>;

    /// Idle → Running. No-op when already running.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Returns the next ready frame, or `Ok(None)` if none is ready yet.
    ///
    /// Never blocks waiting for the device. Fails with `NotRunning` while idle.
    fn grab(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Running → Idle and releases the device. Always succeeds; release
    /// problems are logged. No-op while idle.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    fn state(&self) -> CaptureState {
        if self.is_running() {
            CaptureState::Running
        } else {
            CaptureState::Idle
        }
    }
}
