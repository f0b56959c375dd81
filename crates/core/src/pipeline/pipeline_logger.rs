use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::pipeline::frame_processor::SkipReason;

/// Observability sink for tick-level pipeline events.
///
/// Keeps the processor free of any particular output mechanism: the CLI
/// aggregates into a summary, tests discard everything.
pub trait PipelineLogger: Send {
    /// Record how long a named stage took for one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per frame).
    fn metric(&mut self, name: &str, value: f64);

    /// A tick ended without rendering. `consecutive` counts skips in a row,
    /// including this one.
    fn tick_skipped(&mut self, reason: &SkipReason, consecutive: usize);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn tick_skipped(&mut self, _reason: &SkipReason, _consecutive: usize) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum and maximum of one timing or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aggregate {
    pub count: u64,
    pub sum: f64,
    pub max: f64,
}

impl Aggregate {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 { value } else { self.max.max(value) };
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Logger that forwards to the `log` crate and keeps per-stage timing,
/// metric and skip aggregates for a summary at the end of a run.
///
/// Storage is one aggregate per stage, metric and skip reason, so it stays
/// constant however long the stream runs. Repeated capture faults are
/// reported every `throttle_ticks` ticks rather than on each one.
pub struct StdoutPipelineLogger {
    throttle_ticks: usize,
    timings: HashMap<String, Aggregate>,
    metrics: HashMap<String, Aggregate>,
    skips: BTreeMap<&'static str, u64>,
    start_time: Instant,
    emitted: u64,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_ticks: usize) -> Self {
        Self {
            throttle_ticks: throttle_ticks.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            skips: BTreeMap::new(),
            start_time: Instant::now(),
            emitted: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() && self.skips.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = Vec::new();
        lines.push(format!(
            "Pipeline summary ({} frames emitted, {:.1}s total):",
            self.emitted,
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, agg) in stages {
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms",
                agg.mean(),
                agg.max,
                agg.sum
            ));
        }

        let mut metrics: Vec<_> = self.metrics.iter().collect();
        metrics.sort_by(|a, b| a.0.cmp(b.0));
        for (name, agg) in metrics {
            lines.push(format!("  {name}: avg {:.1}", agg.mean()));
        }

        for (reason, count) in &self.skips {
            lines.push(format!("  skipped ({reason}): {count}"));
        }

        if self.emitted > 0 && elapsed_ms > 0.0 {
            let fps = self.emitted as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<Aggregate> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<Aggregate> {
        self.metrics.get(name).copied()
    }

    pub fn skips_for(&self, reason: &str) -> u64 {
        self.skips.get(reason).copied().unwrap_or(0)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        record(&mut self.timings, stage, duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        // One `faces` sample per emitted frame.
        if name == "faces" {
            self.emitted += 1;
        }
        record(&mut self.metrics, name, value);
    }

    fn tick_skipped(&mut self, reason: &SkipReason, consecutive: usize) {
        *self.skips.entry(reason.label()).or_default() += 1;
        match reason {
            SkipReason::NoFrame | SkipReason::NotRunning | SkipReason::ZeroSurface => {
                log::trace!("Tick skipped: {reason}");
            }
            SkipReason::Malformed(_) => log::warn!("Tick skipped: {reason}"),
            SkipReason::CaptureFault(_) => {
                if consecutive == 1 || consecutive % self.throttle_ticks == 0 {
                    log::warn!("Tick skipped ({consecutive} in a row): {reason}");
                }
            }
        }
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn record(table: &mut HashMap<String, Aggregate>, key: &str, value: f64) {
    match table.get_mut(key) {
        Some(agg) => agg.record(value),
        None => {
            let mut agg = Aggregate::default();
            agg.record(value);
            table.insert(key.to_string(), agg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.timing("detect", 5.0);
        logger.metric("faces", 1.0);
        logger.tick_skipped(&SkipReason::NoFrame, 1);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_aggregates_values() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("decode", 5.0);

        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.mean(), 25.0);
        assert_relative_eq!(detect.max, 30.0);
        assert_relative_eq!(detect.sum, 50.0);
        assert_eq!(logger.timings_for("decode").unwrap().count, 1);
        assert!(logger.timings_for("annotate").is_none());
    }

    #[test]
    fn test_storage_stays_bounded_on_long_runs() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 0..100_000 {
            logger.timing("decode", 1.0);
            logger.timing("detect", (i % 7) as f64);
            logger.metric("faces", 1.0);
            logger.tick_skipped(&SkipReason::NoFrame, 1);
        }

        assert_eq!(logger.timings.len(), 2);
        assert_eq!(logger.metrics.len(), 1);
        assert_eq!(logger.skips.len(), 1);
        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 100_000);
        assert_relative_eq!(detect.max, 6.0);
        assert_eq!(logger.skips_for("no frame"), 100_000);
    }

    #[test]
    fn test_max_tracks_negative_only_samples() {
        let mut agg = Aggregate::default();
        agg.record(-3.0);
        agg.record(-1.0);
        assert_relative_eq!(agg.max, -1.0);
    }

    #[test]
    fn test_faces_metric_counts_emitted_frames() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("faces", 2.0);
        logger.metric("faces", 0.0);
        assert_eq!(logger.emitted, 2);
        assert_relative_eq!(logger.metrics_for("faces").unwrap().mean(), 1.0);
    }
    #[test]
    fn test_skips_counted_by_reason() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.tick_skipped(&SkipReason::NoFrame, 1);
        logger.tick_skipped(&SkipReason::NoFrame, 2);
        logger.tick_skipped(&SkipReason::Malformed("short buffer".into()), 1);

        assert_eq!(logger.skips_for("no frame"), 2);
        assert_eq!(logger.skips_for("malformed frame"), 1);
        assert_eq!(logger.skips_for("capture fault"), 0);
    }

    #[test]
    fn test_summary_includes_stages_skips_and_fps() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 10.0);
        logger.metric("faces", 1.0);
        logger.tick_skipped(&SkipReason::ZeroSurface, 1);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Pipeline summary"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("skipped (zero-size surface): 1"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_default_throttle() {
        assert_eq!(StdoutPipelineLogger::default().throttle_ticks, 30);
    }
}
