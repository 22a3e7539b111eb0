//! Level monitoring
//!
//! [`ExtremumTracker`] holds the running extrema; [`LevelMonitor`] adapts it
//! to the audio callback interface and forwards reports to a sink.

pub mod trace;
pub mod tracker;

pub use trace::{BlockTracer, LogTracer};
pub use tracker::{
    quantize, ExtremaPolicy, ExtremumTracker, IntervalSource, RangeMode, ReportInterval,
    TrackerState,
};

use crate::audio::AudioCallback;
use crate::config::MonitorConfig;
use crate::report::ReportSink;

/// Audio callback that feeds an [`ExtremumTracker`] and emits its reports.
///
/// The monitor is moved into the audio callback and owned by it, so the
/// tracker state is only ever touched from the audio thread.
pub struct LevelMonitor<S: ReportSink> {
    tracker: ExtremumTracker,
    sink: S,
    tracer: Option<Box<dyn BlockTracer>>,
}

impl<S: ReportSink> LevelMonitor<S> {
    /// Create a monitor with default policies
    pub fn new(sink: S) -> Self {
        Self {
            tracker: ExtremumTracker::new(),
            sink,
            tracer: None,
        }
    }

    /// Create a monitor from configuration
    pub fn from_config(config: &MonitorConfig, sink: S) -> Self {
        let mut monitor = Self {
            tracker: ExtremumTracker::with_policies(config.extrema_policy, config.range_mode),
            sink,
            tracer: None,
        };
        if config.trace_blocks {
            monitor = monitor.with_tracer(Box::new(LogTracer::new()));
        }
        monitor
    }

    /// Attach a diagnostic tracer
    pub fn with_tracer(mut self, tracer: Box<dyn BlockTracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn tracker(&self) -> &ExtremumTracker {
        &self.tracker
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: ReportSink + 'static> AudioCallback for LevelMonitor<S> {
    fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        let interval = self.tracker.configure(sample_rate, block_size);

        match interval.source {
            IntervalSource::Derived => tracing::info!(
                "Report interval set to every {} blocks ({} Hz, {} samples/block)",
                interval.blocks, sample_rate, block_size
            ),
            IntervalSource::Defaulted => tracing::warn!(
                "Unusable stream settings ({} Hz, {} samples/block), reporting every {} blocks",
                sample_rate, block_size, interval.blocks
            ),
            IntervalSource::Clamped => tracing::info!(
                "Blocks longer than a second ({} Hz, {} samples/block), reporting every block",
                sample_rate, block_size
            ),
        }

        if let Some(tracer) = self.tracer.as_mut() {
            tracer.configured(sample_rate, block_size, &interval);
        }
    }

    fn process(&mut self, samples: &[f32], input_available: bool) {
        if input_available && self.tracker.is_configured() {
            if let Some(tracer) = self.tracer.as_mut() {
                tracer.block(samples.len(), samples.first().map(|s| quantize(*s)));
            }
        }

        if let Some(report) = self.tracker.process_block(samples, input_available) {
            self.sink.emit(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::LevelReport;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct VecSink(Vec<LevelReport>);

    impl ReportSink for VecSink {
        fn emit(&mut self, report: LevelReport) {
            self.0.push(report);
        }
    }

    struct CountingTracer {
        configured: Arc<AtomicU64>,
        blocks: Arc<AtomicU64>,
    }

    impl BlockTracer for CountingTracer {
        fn configured(&mut self, _: f64, _: usize, _: &ReportInterval) {
            self.configured.fetch_add(1, Ordering::Relaxed);
        }

        fn block(&mut self, _: usize, _: Option<i32>) {
            self.blocks.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_prepare_then_process_emits_reports() {
        let mut monitor = LevelMonitor::new(VecSink::default());
        monitor.prepare(1_000.0, 500);

        monitor.process(&[0.25, -0.25], true);
        monitor.process(&[0.5], true);
        monitor.process(&[0.5], false);

        let reports = monitor.into_sink().0;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].min_sample, quantize(-0.25));
        assert_eq!(reports[0].max_sample, quantize(0.5));
    }

    #[test]
    fn test_from_config_applies_policies() {
        let config = MonitorConfig {
            extrema_policy: ExtremaPolicy::ResetPerInterval,
            range_mode: RangeMode::Span,
            trace_blocks: false,
        };
        let monitor = LevelMonitor::from_config(&config, VecSink::default());
        assert_eq!(monitor.tracker().policy(), ExtremaPolicy::ResetPerInterval);
        assert_eq!(monitor.tracker().range_mode(), RangeMode::Span);
    }

    #[test]
    fn test_tracer_sees_only_scanned_blocks() {
        let configured = Arc::new(AtomicU64::new(0));
        let blocks = Arc::new(AtomicU64::new(0));
        let mut monitor = LevelMonitor::new(VecSink::default()).with_tracer(Box::new(CountingTracer {
            configured: configured.clone(),
            blocks: blocks.clone(),
        }));

        // Before prepare nothing is scanned
        monitor.process(&[0.1], true);
        monitor.prepare(48_000.0, 480);
        monitor.process(&[0.1], true);
        monitor.process(&[0.1], false);

        assert_eq!(configured.load(Ordering::Relaxed), 1);
        assert_eq!(blocks.load(Ordering::Relaxed), 1);
    }
}
