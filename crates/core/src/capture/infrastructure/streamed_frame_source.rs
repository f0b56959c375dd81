use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::capture::domain::capture_driver::CaptureDriver;
use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::capture::infrastructure::device_claims::{DeviceClaim, DeviceClaims};
use crate::shared::constants::DEFAULT_DEVICE_INDEX;
use crate::shared::frame::Frame;

/// Frames waiting between the producer thread and `grab`. One slot keeps
/// the displayed frame at most one device period old.
const FEED_CAPACITY: usize = 1;

/// Frame source that drains a driver's producer thread without blocking.
///
/// Layout: `driver thread → single-slot feed → grab()`
pub struct StreamedFrameSource<D: CaptureDriver> {
    driver: D,
    claims: DeviceClaims,
    preferred_device: u32,
    device_index: Option<u32>,
    stream: Option<ActiveStream>,
}

struct ActiveStream {
    feed: Receiver<Frame>,
    stop: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
    claim: DeviceClaim,
}

impl<D: CaptureDriver> StreamedFrameSource<D> {
    pub fn new(driver: D) -> Self {
        Self::with_claims(driver, DeviceClaims::process_wide())
    }

    pub fn with_claims(driver: D, claims: DeviceClaims) -> Self {
        Self {
            driver,
            claims,
            preferred_device: DEFAULT_DEVICE_INDEX,
            device_index: None,
            stream: None,
        }
    }

    /// Device that `start` opens when nothing was opened explicitly.
    pub fn prefer_device(mut self, device_index: u32) -> Self {
        self.preferred_device = device_index;
        self
    }

    pub fn device_index(&self) -> Option<u32> {
        self.device_index
    }
}

impl<D: CaptureDriver> FrameSource for StreamedFrameSource<D> {
    fn open(&mut self, device_index: u32) -> Result<(), CaptureError> {
        if let Some(bound) = self.device_index {
            if bound != device_index {
                log::debug!("Already bound to device {bound}; ignoring open({device_index})");
            }
            return Ok(());
        }
        let count = self.driver.device_count()?;
        if device_index >= count {
            return Err(CaptureError::DeviceUnavailable(device_index));
        }
        self.device_index = Some(device_index);
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let index = match self.device_index {
            Some(index) => index,
            None => {
                self.open(self.preferred_device)?;
                self.preferred_device
            }
        };

        let claim = self.claims.acquire(index)?;
        let (feed_tx, feed_rx) = crossbeam_channel::bounded(FEED_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let producer = self.driver.launch(index, feed_tx, stop.clone())?;

        log::info!("Capture started on device {index}");
        self.stream = Some(ActiveStream {
            feed: feed_rx,
            stop,
            producer: Some(producer),
            claim,
        });
        Ok(())
    }

    fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
        let stream = self.stream.as_ref().ok_or(CaptureError::NotRunning)?;
        match stream.feed.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(CaptureError::HardwareFault(format!(
                "capture stream on device {} ended unexpectedly",
                stream.claim.index()
            ))),
        }
    }

    fn stop(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        stream.stop.store(true, Ordering::Relaxed);
        let index = stream.claim.index();
        drop(stream.feed);
        if let Some(producer) = stream.producer.take() {
            if producer.join().is_err() {
                log::warn!("Capture thread for device {index} panicked during shutdown");
            }
        }
        log::info!("Capture stopped on device {index}");
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}

impl<D: CaptureDriver> Drop for StreamedFrameSource<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::frame_source::CaptureState;
    use crate::shared::frame::PixelFormat;
    use crossbeam_channel::Sender;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Driver whose frames are pushed by the test through `feed`.
    #[derive(Clone, Default)]
    struct ManualDriver {
        count: u32,
        fail_launch: Option<CaptureError>,
        feed: Arc<Mutex<Option<Sender<Frame>>>>,
        launches: Arc<Mutex<usize>>,
    }

    impl ManualDriver {
        fn with_devices(count: u32) -> Self {
            Self {
                count,
                ..Default::default()
            }
        }

        fn push(&self, index: u64) {
            let frame = Frame::new(vec![0; 12], 2, 2, PixelFormat::Rgb24, index);
            let guard = self.feed.lock().unwrap();
            guard.as_ref().unwrap().try_send(frame).unwrap();
        }

        fn disconnect(&self) {
            self.feed.lock().unwrap().take();
        }
    }

    impl CaptureDriver for ManualDriver {
        fn device_count(&self) -> Result<u32, CaptureError> {
            Ok(self.count)
        }

        fn launch(
            &self,
            _device_index: u32,
            feed: Sender<Frame>,
            stop: Arc<AtomicBool>,
        ) -> Result<JoinHandle<()>, CaptureError> {
            if let Some(err) = self.fail_launch.clone() {
                return Err(err);
            }
            *self.launches.lock().unwrap() += 1;
            *self.feed.lock().unwrap() = Some(feed);
            Ok(std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }))
        }
    }

    fn source(driver: &ManualDriver) -> StreamedFrameSource<ManualDriver> {
        StreamedFrameSource::with_claims(driver.clone(), DeviceClaims::new())
    }

    #[test]
    fn test_new_source_is_idle() {
        let src = source(&ManualDriver::with_devices(1));
        assert!(!src.is_running());
        assert_eq!(src.state(), CaptureState::Idle);
    }

    #[test]
    fn test_open_missing_device_is_unavailable() {
        let mut src = source(&ManualDriver::with_devices(1));
        assert_eq!(src.open(1), Err(CaptureError::DeviceUnavailable(1)));
        assert_eq!(src.device_index(), None);
    }

    #[test]
    fn test_reopen_while_bound_is_noop() {
        let mut src = source(&ManualDriver::with_devices(2));
        src.open(1).unwrap();
        src.open(0).unwrap();
        assert_eq!(src.device_index(), Some(1));
    }

    #[test]
    fn test_grab_while_idle_is_not_running() {
        let mut src = source(&ManualDriver::with_devices(1));
        assert_eq!(src.grab().unwrap_err(), CaptureError::NotRunning);
        src.open(0).unwrap();
        assert_eq!(src.grab().unwrap_err(), CaptureError::NotRunning);
    }

    #[test]
    fn test_grab_before_first_frame_returns_none() {
        let driver = ManualDriver::with_devices(1);
        let mut src = source(&driver);
        src.open(0).unwrap();
        src.start().unwrap();

        assert!(src.grab().unwrap().is_none());
        assert!(src.grab().unwrap().is_none());
        assert_eq!(src.state(), CaptureState::Running);
    }

    #[test]
    fn test_grab_returns_pushed_frame_once() {
        let driver = ManualDriver::with_devices(1);
        let mut src = source(&driver);
        src.start().unwrap();

        driver.push(7);
        assert_eq!(src.grab().unwrap().unwrap().index(), 7);
        assert!(src.grab().unwrap().is_none());
    }

    #[test]
    fn test_start_without_open_binds_default_device() {
        let mut src = source(&ManualDriver::with_devices(1));
        src.start().unwrap();
        assert_eq!(src.device_index(), Some(DEFAULT_DEVICE_INDEX));
    }

    #[test]
    fn test_start_uses_preferred_device() {
        let mut src = source(&ManualDriver::with_devices(3)).prefer_device(2);
        src.start().unwrap();
        assert_eq!(src.device_index(), Some(2));
    }

    #[test]
    fn test_start_on_missing_preferred_device_stays_idle() {
        let mut src = source(&ManualDriver::with_devices(1)).prefer_device(4);
        assert_eq!(src.start(), Err(CaptureError::DeviceUnavailable(4)));
        assert!(!src.is_running());
    }

    #[test]
    fn test_start_twice_is_noop() {
        let driver = ManualDriver::with_devices(1);
        let mut src = source(&driver);
        src.start().unwrap();
        src.start().unwrap();
        assert_eq!(*driver.launches.lock().unwrap(), 1);
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let mut src = source(&ManualDriver::with_devices(1));
        src.stop();
        assert_eq!(src.state(), CaptureState::Idle);
    }

    #[test]
    fn test_stop_returns_to_idle_and_releases_device() {
        let driver = ManualDriver::with_devices(1);
        let claims = DeviceClaims::new();
        let mut src = StreamedFrameSource::with_claims(driver.clone(), claims.clone());
        src.start().unwrap();
        assert!(claims.is_claimed(0));

        src.stop();
        assert!(!src.is_running());
        assert!(!claims.is_claimed(0));
        assert_eq!(src.grab().unwrap_err(), CaptureError::NotRunning);
    }

    #[test]
    fn test_second_source_on_same_device_is_busy() {
        let claims = DeviceClaims::new();
        let mut first =
            StreamedFrameSource::with_claims(ManualDriver::with_devices(1), claims.clone());
        let mut second = StreamedFrameSource::with_claims(ManualDriver::with_devices(1), claims);
        first.start().unwrap();

        assert!(matches!(
            second.start(),
            Err(CaptureError::DeviceBusy { index: 0, .. })
        ));
        assert!(!second.is_running());

        first.stop();
        assert!(second.start().is_ok());
    }

    #[test]
    fn test_launch_failure_stays_idle_and_releases_claim() {
        let driver = ManualDriver {
            count: 1,
            fail_launch: Some(CaptureError::HardwareFault("driver exploded".into())),
            ..Default::default()
        };
        let claims = DeviceClaims::new();
        let mut src = StreamedFrameSource::with_claims(driver, claims.clone());

        assert!(matches!(src.start(), Err(CaptureError::HardwareFault(_))));
        assert!(!src.is_running());
        assert!(!claims.is_claimed(0));
    }

    #[test]
    fn test_disconnected_producer_is_hardware_fault() {
        let driver = ManualDriver::with_devices(1);
        let mut src = source(&driver);
        src.start().unwrap();
        driver.disconnect();

        assert!(matches!(src.grab(), Err(CaptureError::HardwareFault(_))));
        assert!(src.is_running());
    }

    #[test]
    fn test_can_restart_after_stop() {
        let driver = ManualDriver::with_devices(1);
        let mut src = source(&driver);
        src.start().unwrap();
        src.stop();
        src.start().unwrap();
        driver.push(1);
        assert!(src.grab().unwrap().is_some());
    }
}
