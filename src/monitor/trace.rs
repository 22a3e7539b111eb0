//! Optional per-block diagnostics
//!
//! Off by default. When enabled the monitor reports the chosen interval and,
//! for every scanned block, its length and first quantized sample.

use crate::monitor::tracker::ReportInterval;

/// Receiver of per-block diagnostic events
pub trait BlockTracer: Send {
    /// Called after the tracker has been (re)configured
    fn configured(&mut self, sample_rate: f64, block_size: usize, interval: &ReportInterval);

    /// Called for every block that is scanned
    fn block(&mut self, len: usize, first_sample: Option<i32>);
}

/// Tracer that forwards events to `tracing`
#[derive(Debug, Default)]
pub struct LogTracer {
    blocks: u64,
}

impl LogTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks traced so far
    pub fn blocks(&self) -> u64 {
        self.blocks
    }
}

impl BlockTracer for LogTracer {
    fn configured(&mut self, sample_rate: f64, block_size: usize, interval: &ReportInterval) {
        self.blocks = 0;
        tracing::debug!(
            sample_rate,
            block_size,
            interval = interval.blocks,
            source = ?interval.source,
            "Tracker configured"
        );
    }

    fn block(&mut self, len: usize, first_sample: Option<i32>) {
        self.blocks += 1;
        tracing::trace!(block = self.blocks, len, first_sample, "Block scanned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::LevelMonitor;
    use crate::report::ChannelSink;
    use crate::audio::AudioCallback;

    #[test]
    fn test_log_tracer_counts_blocks_and_resets_on_configure() {
        let mut tracer = LogTracer::new();
        let interval = ReportInterval::derive(48_000.0, 480);

        tracer.configured(48_000.0, 480, &interval);
        tracer.block(480, Some(12));
        tracer.block(480, None);
        assert_eq!(tracer.blocks(), 2);

        tracer.configured(44_100.0, 512, &ReportInterval::derive(44_100.0, 512));
        assert_eq!(tracer.blocks(), 0);
    }

    #[test]
    fn test_monitor_with_log_tracer_still_reports() {
        let (sink, rx) = ChannelSink::new(4);
        let mut monitor = LevelMonitor::new(sink).with_tracer(Box::new(LogTracer::new()));

        monitor.prepare(2.0, 1);
        monitor.process(&[0.5, -0.5], true);
        monitor.process(&[0.25], true);

        let report = rx.try_recv().unwrap();
        assert_eq!(report.min_sample, -16383);
        assert_eq!(report.max_sample, 16383);
        assert!(rx.try_recv().is_err());
    }
}
