use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::detection::domain::face_locator::{DetectionError, FaceLocator};
use crate::imaging::decode::decode;
use crate::imaging::transform::{mirror_horizontal, to_grayscale};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::render_sink::RenderSink;
use crate::shared::constants::STALL_TICKS;
use crate::shared::detection_result::DetectionResult;

/// Why a tick ended without rendering anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The source had nothing ready yet.
    NoFrame,
    /// The source is idle.
    NotRunning,
    /// The device reported an error.
    CaptureFault(String),
    /// The frame buffer could not be decoded.
    Malformed(String),
    /// The render surface has no area yet; the frame is dropped.
    ZeroSurface,
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::NoFrame => "no frame",
            SkipReason::NotRunning => "not running",
            SkipReason::CaptureFault(_) => "capture fault",
            SkipReason::Malformed(_) => "malformed frame",
            SkipReason::ZeroSurface => "zero-size surface",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::CaptureFault(detail) | SkipReason::Malformed(detail) => {
                write!(f, "{}: {detail}", self.label())
            }
            _ => f.write_str(self.label()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Emitted { frame_index: u64, face_count: usize },
    Skipped(SkipReason),
}

/// One acquire → transform → detect → annotate → emit step per tick.
///
/// Every per-frame failure turns into a skipped tick; nothing propagates to
/// the scheduler. Frame buffers and intermediate images are owned by a
/// single tick and dropped before the next one starts.
pub struct FrameProcessor {
    source: Box<dyn FrameSource>,
    locator: Arc<dyn FaceLocator>,
    logger: Box<dyn PipelineLogger>,
    stall_ticks: usize,
    consecutive_skips: usize,
    stalled: bool,
}

impl FrameProcessor {
    pub fn new(
        source: Box<dyn FrameSource>,
        locator: Arc<dyn FaceLocator>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            locator,
            logger,
            stall_ticks: STALL_TICKS,
            consecutive_skips: 0,
            stalled: false,
        }
    }

    /// Number of skipped ticks in a row before the sink is told the signal is lost.
    pub fn with_stall_ticks(mut self, ticks: usize) -> Self {
        self.stall_ticks = ticks.max(1);
        self
    }

    pub fn source(&self) -> &dyn FrameSource {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn FrameSource {
        self.source.as_mut()
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn consecutive_skips(&self) -> usize {
        self.consecutive_skips
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn tick(&mut self, sink: &dyn RenderSink) -> TickOutcome {
        let outcome = self.run_tick(sink);
        self.track_stall(&outcome, sink);
        outcome
    }

    fn run_tick(&mut self, sink: &dyn RenderSink) -> TickOutcome {
        let frame = match self.source.grab() {
            Ok(Some(frame)) => frame,
            Ok(None) => return TickOutcome::Skipped(SkipReason::NoFrame),
            Err(CaptureError::NotRunning) => return TickOutcome::Skipped(SkipReason::NotRunning),
            Err(e) => return TickOutcome::Skipped(SkipReason::CaptureFault(e.to_string())),
        };
        let frame_index = frame.index();

        let t0 = Instant::now();
        let mut color = match decode(&frame) {
            Ok(image) => image,
            Err(e) => return TickOutcome::Skipped(SkipReason::Malformed(e.to_string())),
        };
        drop(frame);
        mirror_horizontal(&mut color);
        let gray = to_grayscale(&color);
        self.logger.timing("decode", elapsed_ms(t0));

        let t0 = Instant::now();
        let detection = match self.locator.detect(&gray) {
            Ok(result) => result,
            Err(DetectionError::InvalidInput(reason)) => {
                log::debug!("Frame {frame_index} not searched: {reason}");
                DetectionResult::empty(gray.width(), gray.height())
            }
            Err(e) => {
                log::warn!("Face detection failed on frame {frame_index}: {e}");
                DetectionResult::empty(gray.width(), gray.height())
            }
        };
        drop(gray);
        self.logger.timing("detect", elapsed_ms(t0));

        let t0 = Instant::now();
        self.locator.draw_boxes(&mut color, &detection.boxes);
        self.logger.timing("annotate", elapsed_ms(t0));

        let (surface_w, surface_h) = sink.surface_size();
        if surface_w == 0 || surface_h == 0 {
            return TickOutcome::Skipped(SkipReason::ZeroSurface);
        }

        let face_count = detection.face_count();
        sink.present(color, face_count);
        self.logger.metric("faces", face_count as f64);

        TickOutcome::Emitted {
            frame_index,
            face_count,
        }
    }

    fn track_stall(&mut self, outcome: &TickOutcome, sink: &dyn RenderSink) {
        match outcome {
            TickOutcome::Emitted { .. } => {
                if self.stalled {
                    sink.signal_restored();
                    self.logger.info("Camera signal restored");
                }
                self.consecutive_skips = 0;
                self.stalled = false;
            }
            TickOutcome::Skipped(reason) => {
                self.consecutive_skips += 1;
                self.logger.tick_skipped(reason, self.consecutive_skips);
                if !self.stalled && self.consecutive_skips >= self.stall_ticks {
                    self.stalled = true;
                    sink.signal_lost();
                    self.logger.info(&format!(
                        "No camera signal for {} ticks ({reason})",
                        self.consecutive_skips
                    ));
                }
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
