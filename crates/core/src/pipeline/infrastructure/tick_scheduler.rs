use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{select, Sender};

use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::render_sink::RenderSink;
use crate::shared::constants::DEFAULT_TICK_PERIOD;

/// Runs a [`FrameProcessor`] on a dedicated worker thread at a fixed period.
///
/// Ticks never overlap: the worker runs one tick to completion before it
/// waits for the next. A tick that overruns the period is followed
/// immediately by the next one; missed ticks are not queued up.
pub struct TickScheduler {
    period: Duration,
    max_ticks: Option<u64>,
}

impl TickScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period: if period.is_zero() {
                DEFAULT_TICK_PERIOD
            } else {
                period
            },
            max_ticks: None,
        }
    }

    /// Stops the worker on its own after `ticks` ticks.
    pub fn with_max_ticks(mut self, ticks: Option<u64>) -> Self {
        self.max_ticks = ticks;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn spawn(&self, processor: FrameProcessor, sink: Arc<dyn RenderSink>) -> RunningPipeline {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let cancelled = Arc::new(AtomicBool::new(false));
        let ticks_run = Arc::new(AtomicU64::new(0));

        let handle = {
            let cancelled = cancelled.clone();
            let ticks_run = ticks_run.clone();
            let period = self.period;
            let max_ticks = self.max_ticks;
            std::thread::spawn(move || {
                let mut processor = processor;
                let ticker = crossbeam_channel::tick(period);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            if cancelled.load(Ordering::Acquire) {
                                break;
                            }
                            processor.tick(sink.as_ref());
                            let done = ticks_run.fetch_add(1, Ordering::AcqRel) + 1;
                            if max_ticks.is_some_and(|max| done >= max) {
                                break;
                            }
                        }
                    }
                }
                processor
            })
        };

        log::debug!("Tick worker started ({} ms period)", self.period.as_millis());
        RunningPipeline {
            stop_tx: Some(stop_tx),
            cancelled,
            ticks_run,
            handle,
        }
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_PERIOD)
    }
}

/// Handle to a running tick worker.
pub struct RunningPipeline {
    stop_tx: Option<Sender<()>>,
    cancelled: Arc<AtomicBool>,
    ticks_run: Arc<AtomicU64>,
    handle: JoinHandle<FrameProcessor>,
}

impl RunningPipeline {
    pub fn ticks_run(&self) -> u64 {
        self.ticks_run.load(Ordering::Acquire)
    }

    /// True once the worker has exited on its own (tick limit reached).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Requests the worker to stop and waits for it. An in-flight tick runs
    /// to completion first; no tick starts after this call.
    ///
    /// Returns `None` if the worker panicked.
    pub fn stop(mut self) -> Option<FrameProcessor> {
        self.cancelled.store(true, Ordering::Release);
        drop(self.stop_tx.take());
        self.join()
    }

    /// Waits for the worker to exit on its own.
    pub fn wait(self) -> Option<FrameProcessor> {
        self.join()
    }

    fn join(self) -> Option<FrameProcessor> {
        match self.handle.join() {
            Ok(processor) => Some(processor),
            Err(_) => {
                log::error!("Tick worker panicked");
                None
            }
        }
    }
}
