use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::capture::domain::frame_source::CaptureError;
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::infrastructure::tick_scheduler::{RunningPipeline, TickScheduler};
use crate::pipeline::render_sink::RenderSink;
use crate::snapshot::domain::snapshot_writer::{snapshot_file_name, SnapshotError, SnapshotWriter};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("pipeline worker panicked; session must be rebuilt")]
    WorkerLost,
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

enum Stage {
    Idle(FrameProcessor),
    Running(RunningPipeline),
    Lost,
}

/// The user-facing start / stop / snapshot controls.
///
/// Owns the processor while idle and hands it to a tick worker while running.
pub struct CaptureSession {
    stage: Stage,
    sink: Arc<dyn RenderSink>,
    scheduler: TickScheduler,
    writer: Box<dyn SnapshotWriter>,
}

impl CaptureSession {
    pub fn new(
        processor: FrameProcessor,
        sink: Arc<dyn RenderSink>,
        scheduler: TickScheduler,
        writer: Box<dyn SnapshotWriter>,
    ) -> Self {
        Self {
            stage: Stage::Idle(processor),
            sink,
            scheduler,
            writer,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(&self.stage, Stage::Running(running) if !running.is_finished())
    }

    pub fn ticks_run(&self) -> u64 {
        match &self.stage {
            Stage::Running(running) => running.ticks_run(),
            _ => 0,
        }
    }

    /// Starts capture and begins ticking. A no-op while running.
    ///
    /// On failure the session stays idle and the error is returned for the
    /// caller to surface.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.reap();
        let mut processor = match std::mem::replace(&mut self.stage, Stage::Lost) {
            Stage::Idle(processor) => processor,
            running @ Stage::Running(_) => {
                self.stage = running;
                return Ok(());
            }
            Stage::Lost => return Err(SessionError::WorkerLost),
        };

        if let Err(e) = processor.source_mut().start() {
            log::warn!("Could not start capture: {e}");
            self.stage = Stage::Idle(processor);
            return Err(e.into());
        }

        self.stage = Stage::Running(self.scheduler.spawn(processor, self.sink.clone()));
        log::info!("Capture started");
        Ok(())
    }

    /// Stops ticking, releases the device and blanks the view.
    /// A no-op while idle.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        let running = match std::mem::replace(&mut self.stage, Stage::Lost) {
            Stage::Running(running) => running,
            other => {
                self.stage = other;
                return Ok(());
            }
        };

        let processor = running.stop();
        self.settle(processor)?;
        log::info!("Capture stopped");
        Ok(())
    }

    /// Blocks until a worker with a tick limit finishes, then stops capture.
    pub fn wait(&mut self) -> Result<(), SessionError> {
        let running = match std::mem::replace(&mut self.stage, Stage::Lost) {
            Stage::Running(running) => running,
            other => {
                self.stage = other;
                return Ok(());
            }
        };
        let processor = running.wait();
        self.settle(processor)
    }

    /// Saves what the view currently shows under `dir` and returns the path.
    ///
    /// Works whether or not capture is running; it never grabs a new frame.
    pub fn snapshot(&self, dir: &Path) -> Result<PathBuf, SessionError> {
        let view = self.sink.capture_current_view();
        let path = dir.join(snapshot_file_name(chrono::Local::now().naive_local()));
        self.writer.write(&path, &view)?;
        log::info!("Snapshot saved to {}", path.display());
        Ok(path)
    }

    /// Emits the processor's end-of-run summary.
    pub fn summary(&self) {
        if let Stage::Idle(processor) = &self.stage {
            processor.logger().summary();
        }
    }

    fn reap(&mut self) {
        if matches!(&self.stage, Stage::Running(running) if running.is_finished()) {
            let _ = self.wait();
        }
    }

    fn settle(&mut self, processor: Option<FrameProcessor>) -> Result<(), SessionError> {
        self.sink.clear();
        match processor {
            Some(mut processor) => {
                processor.source_mut().stop();
                self.stage = Stage::Idle(processor);
                Ok(())
            }
            None => {
                self.stage = Stage::Lost;
                Err(SessionError::WorkerLost)
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Error stopping capture on shutdown: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::frame_source::FrameSource;
    use crate::pipeline::frame_processor::tests::{
        split_frame, FixedLocator, RecordingSink, ScriptedSource,
    };
    use crate::pipeline::infrastructure::frame_buffer_sink::FrameBufferSink;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::Frame;
    use crate::shared::image::ColorImage;
    use crate::snapshot::infrastructure::png_snapshot_writer::PngSnapshotWriter;
    use std::time::{Duration, Instant};

    struct BusySource;

    impl FrameSource for BusySource {
        fn open(&mut self, _device_index: u32) -> Result<(), CaptureError> {
            Ok(())
        }
        fn start(&mut self) -> Result<(), CaptureError> {
            Err(CaptureError::DeviceBusy {
                index: 0,
                reason: "in use".into(),
            })
        }
        fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
            Err(CaptureError::NotRunning)
        }
        fn stop(&mut self) {}
        fn is_running(&self) -> bool {
            false
        }
    }

    fn session_with(source: Box<dyn FrameSource>, sink: Arc<dyn RenderSink>) -> CaptureSession {
        let processor = FrameProcessor::new(
            source,
            Arc::new(FixedLocator::new(vec![])),
            Box::new(NullPipelineLogger),
        );
        CaptureSession::new(
            processor,
            sink,
            TickScheduler::new(Duration::from_millis(1)),
            Box::new(PngSnapshotWriter::new()),
        )
    }

    fn frames(n: u64) -> Box<ScriptedSource> {
        Box::new(ScriptedSource::new((0..n).map(|i| Ok(Some(split_frame(i)))).collect()))
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_start_failure_stays_idle_and_surfaces_error() {
        let sink = Arc::new(RecordingSink::sized(64, 48));
        let mut session = session_with(Box::new(BusySource), sink);

        let err = session.start().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Capture(CaptureError::DeviceBusy { .. })
        ));
        assert!(!session.is_running());
    }

    #[test]
    fn test_start_stop_cycle_clears_view() {
        let sink = Arc::new(FrameBufferSink::new(4, 2));
        let mut session = session_with(frames(1000), sink.clone());

        session.start().unwrap();
        assert!(session.is_running());
        wait_for(|| sink.presented_count() > 0);
        assert!(sink.presented_count() > 0);

        session.stop().unwrap();
        assert!(!session.is_running());
        assert_eq!(sink.capture_current_view(), ColorImage::blank(4, 2));
        assert_eq!(sink.face_count(), 0);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let sink = Arc::new(RecordingSink::sized(4, 2));
        let mut session = session_with(frames(0), sink);
        session.stop().unwrap();
        session.stop().unwrap();
        assert!(!session.is_running());
    }

    #[test]
    fn test_start_twice_is_noop() {
        let sink = Arc::new(RecordingSink::sized(4, 2));
        let mut session = session_with(frames(1000), sink);
        session.start().unwrap();
        session.start().unwrap();
        assert!(session.is_running());
        session.stop().unwrap();
    }

    #[test]
    fn test_restart_after_stop() {
        let sink = Arc::new(FrameBufferSink::new(4, 2));
        let mut session = session_with(frames(1000), sink.clone());

        session.start().unwrap();
        session.stop().unwrap();
        session.start().unwrap();
        assert!(session.is_running());
        session.stop().unwrap();
    }

    #[test]
    fn test_snapshot_while_idle_saves_blank_view() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(FrameBufferSink::new(8, 6));
        let session = session_with(frames(0), sink);

        let path = session.snapshot(dir.path()).unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("screenshot_"));
        assert!(name.ends_with(".png"));
        let saved = image::open(&path).unwrap().to_rgb8();
        assert_eq!((saved.width(), saved.height()), (8, 6));
        assert!(saved.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_snapshot_captures_presented_view() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(FrameBufferSink::new(4, 2));
        let mut session = session_with(frames(1000), sink.clone());

        session.start().unwrap();
        wait_for(|| sink.presented_count() > 0);
        let path = session.snapshot(dir.path()).unwrap();
        session.stop().unwrap();

        let saved = image::open(&path).unwrap().to_rgb8();
        // Mirrored split frame: blue on the left, red on the right.
        assert_eq!(saved.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(saved.get_pixel(3, 1).0, [255, 0, 0]);
    }

    #[test]
    fn test_wait_returns_after_tick_limit() {
        let sink = Arc::new(RecordingSink::sized(4, 2));
        let processor = FrameProcessor::new(
            frames(10),
            Arc::new(FixedLocator::new(vec![])),
            Box::new(NullPipelineLogger),
        );
        let mut session = CaptureSession::new(
            processor,
            sink.clone(),
            TickScheduler::new(Duration::from_millis(1)).with_max_ticks(Some(2)),
            Box::new(PngSnapshotWriter::new()),
        );

        session.start().unwrap();
        session.wait().unwrap();

        assert!(!session.is_running());
        assert_eq!(sink.presented.lock().unwrap().len(), 2);
    }
}
