//! Streaming extremum tracker
//!
//! Scans audio blocks one sample at a time, keeps the running minimum and
//! maximum of the quantized samples and produces a [`LevelReport`] every
//! `interval` blocks. The interval is derived from the stream configuration
//! so that a report comes out roughly once per second.
//!
//! Extrema start from inverted sentinels (`i32::MAX` / `i32::MIN`) so the
//! first observed sample always replaces both.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_REPORT_INTERVAL_BLOCKS, MIN_REPORT_INTERVAL_BLOCKS, SAMPLE_SCALE};
use crate::report::LevelReport;

/// Quantize a normalized sample to the symmetric 16-bit domain.
///
/// The conversion truncates toward zero. NaN maps to 0 and values far
/// outside [-1.0, 1.0] saturate at the `i32` bounds.
#[inline]
pub fn quantize(sample: f32) -> i32 {
    (sample * SAMPLE_SCALE) as i32
}

/// Whether extrema survive a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremaPolicy {
    /// Running min/max since the stream was configured
    #[default]
    Cumulative,
    /// Min/max restart after every report
    ResetPerInterval,
}

/// How the `range` field of a report is computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeMode {
    /// `loudest - loudest`, always 0. Kept for output compatibility with
    /// the historical monitor; this is a known defect.
    #[default]
    Legacy,
    /// `loudest - quietest`, 0 while no sample has been observed. Saturates
    /// at `i32::MAX` when out-of-range samples pushed both extrema to the bounds.
    Span,
}

/// How the report interval was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalSource {
    /// `floor(sample_rate / block_size)`
    Derived,
    /// Sample rate or block size was not positive
    Defaulted,
    /// Derived value was below the minimum and was raised to it
    Clamped,
}

/// Report interval chosen by [`ExtremumTracker::configure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportInterval {
    /// Blocks between successive reports, always >= 1
    pub blocks: u32,
    pub source: IntervalSource,
}

impl ReportInterval {
    /// Derive the interval for a stream configuration
    pub fn derive(sample_rate: f64, block_size: usize) -> Self {
        if sample_rate.is_nan() || sample_rate <= 0.0 || block_size == 0 {
            return Self {
                blocks: DEFAULT_REPORT_INTERVAL_BLOCKS,
                source: IntervalSource::Defaulted,
            };
        }

        // Float-to-int `as` truncates, which is floor for positive values
        let derived = (sample_rate / block_size as f64) as u32;
        if derived < MIN_REPORT_INTERVAL_BLOCKS {
            Self {
                blocks: MIN_REPORT_INTERVAL_BLOCKS,
                source: IntervalSource::Clamped,
            }
        } else {
            Self {
                blocks: derived,
                source: IntervalSource::Derived,
            }
        }
    }
}

/// Per-stream tracker state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
    /// Smallest quantized sample seen, `i32::MAX` before the first sample
    pub quietest: i32,

    /// Largest quantized sample seen, `i32::MIN` before the first sample
    pub loudest: i32,

    /// Blocks processed since the last report, in `[0, interval]`
    pub blocks_since_report: u32,

    /// Blocks between reports
    pub interval: ReportInterval,
}

impl TrackerState {
    fn new(interval: ReportInterval) -> Self {
        Self {
            quietest: i32::MAX,
            loudest: i32::MIN,
            blocks_since_report: 0,
            interval,
        }
    }

    fn reset_extrema(&mut self) {
        self.quietest = i32::MAX;
        self.loudest = i32::MIN;
    }

    /// True once at least one sample has been observed since the last reset
    pub fn has_samples(&self) -> bool {
        self.quietest <= self.loudest
    }

    fn range(&self, mode: RangeMode) -> i32 {
        match mode {
            // Historical output subtracted the maximum from itself
            RangeMode::Legacy => 0,
            RangeMode::Span if self.has_samples() => self.loudest.saturating_sub(self.quietest),
            RangeMode::Span => 0,
        }
    }
}

/// Streaming min/max tracker.
///
/// Starts unconfigured; blocks handed to it before [`configure`] are
/// ignored. `configure` may be called again at any time and discards all
/// previous state.
///
/// [`configure`]: ExtremumTracker::configure
#[derive(Debug, Clone, Default)]
pub struct ExtremumTracker {
    state: Option<TrackerState>,
    policy: ExtremaPolicy,
    range_mode: RangeMode,
    reports_emitted: u64,
}

impl ExtremumTracker {
    /// Create an unconfigured tracker with cumulative extrema and legacy range
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unconfigured tracker with explicit policies
    pub fn with_policies(policy: ExtremaPolicy, range_mode: RangeMode) -> Self {
        Self {
            state: None,
            policy,
            range_mode,
            reports_emitted: 0,
        }
    }

    /// (Re)initialize for a stream configuration
    pub fn configure(&mut self, sample_rate: f64, block_size: usize) -> ReportInterval {
        let interval = ReportInterval::derive(sample_rate, block_size);
        self.state = Some(TrackerState::new(interval));
        self.reports_emitted = 0;
        interval
    }

    /// Scan one block of samples from the analysed channel.
    ///
    /// Returns a report when this block completes a report interval.
    /// Does nothing when `input_available` is false or the tracker has not
    /// been configured.
    pub fn process_block(&mut self, samples: &[f32], input_available: bool) -> Option<LevelReport> {
        if !input_available {
            return None;
        }
        let state = self.state.as_mut()?;

        for &sample in samples {
            let value = quantize(sample);
            if value < state.quietest {
                state.quietest = value;
            }
            if value > state.loudest {
                state.loudest = value;
            }
        }

        state.blocks_since_report += 1;
        if state.blocks_since_report < state.interval.blocks {
            return None;
        }

        let report = LevelReport {
            sequence: self.reports_emitted,
            min_sample: state.quietest,
            max_sample: state.loudest,
            range: state.range(self.range_mode),
        };

        state.blocks_since_report = 0;
        if self.policy == ExtremaPolicy::ResetPerInterval {
            state.reset_extrema();
        }
        self.reports_emitted += 1;

        Some(report)
    }

    /// Current state, `None` until configured
    pub fn state(&self) -> Option<&TrackerState> {
        self.state.as_ref()
    }

    pub fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    pub fn policy(&self) -> ExtremaPolicy {
        self.policy
    }

    pub fn range_mode(&self) -> RangeMode {
        self.range_mode
    }

    /// Reports emitted since the last `configure`
    pub fn reports_emitted(&self) -> u64 {
        self.reports_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(sample_rate: f64, block_size: usize) -> ExtremumTracker {
        let mut tracker = ExtremumTracker::new();
        tracker.configure(sample_rate, block_size);
        tracker
    }

    #[test]
    fn test_quantize_truncates_toward_zero() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.0), -32767);
        assert_eq!(quantize(0.5), 16383);
        assert_eq!(quantize(-0.5), -16383);
        // 0.00003 * 32767 = 0.983..., truncated rather than rounded
        assert_eq!(quantize(0.00003), 0);
        assert_eq!(quantize(-0.00003), 0);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn test_interval_derivation() {
        assert_eq!(
            ReportInterval::derive(48_000.0, 480),
            ReportInterval { blocks: 100, source: IntervalSource::Derived }
        );
        assert_eq!(ReportInterval::derive(44_100.0, 512).blocks, 86);
        assert_eq!(ReportInterval::derive(0.0, 480).source, IntervalSource::Defaulted);
        assert_eq!(ReportInterval::derive(0.0, 480).blocks, 100);
        assert_eq!(ReportInterval::derive(48_000.0, 0).blocks, 100);
        assert_eq!(ReportInterval::derive(-44_100.0, 512).blocks, 100);
        assert_eq!(ReportInterval::derive(f64::NAN, 512).source, IntervalSource::Defaulted);
        assert_eq!(
            ReportInterval::derive(100.0, 480),
            ReportInterval { blocks: 1, source: IntervalSource::Clamped }
        );
    }

    #[test]
    fn test_configure_resets_sentinels() {
        let tracker = configured(48_000.0, 480);
        let state = tracker.state().unwrap();
        assert_eq!(state.quietest, i32::MAX);
        assert_eq!(state.loudest, i32::MIN);
        assert_eq!(state.blocks_since_report, 0);
        assert!(!state.has_samples());
    }

    #[test]
    fn test_unconfigured_is_noop() {
        let mut tracker = ExtremumTracker::new();
        assert!(tracker.process_block(&[0.5, -0.5], true).is_none());
        assert!(tracker.state().is_none());
    }

    #[test]
    fn test_tracks_extrema_within_block() {
        let mut tracker = configured(48_000.0, 4);
        tracker.process_block(&[0.1, -0.25, 0.75, 0.0], true);

        let state = tracker.state().unwrap();
        assert_eq!(state.quietest, quantize(-0.25));
        assert_eq!(state.loudest, quantize(0.75));
        assert_eq!(state.blocks_since_report, 1);
    }

    #[test]
    fn test_unavailable_input_leaves_state_untouched() {
        let mut tracker = configured(48_000.0, 480);
        tracker.process_block(&[0.2, -0.2], true);
        let before = tracker.state().cloned();

        assert!(tracker.process_block(&[1.0, -1.0], false).is_none());
        assert_eq!(tracker.state().cloned(), before);
    }

    #[test]
    fn test_empty_block_advances_counter_only() {
        let mut tracker = configured(48_000.0, 480);
        tracker.process_block(&[], true);

        let state = tracker.state().unwrap();
        assert_eq!(state.blocks_since_report, 1);
        assert_eq!(state.quietest, i32::MAX);
        assert_eq!(state.loudest, i32::MIN);
    }

    #[test]
    fn test_report_cadence() {
        let mut tracker = configured(1_000.0, 250);
        assert_eq!(tracker.state().unwrap().interval.blocks, 4);

        let mut reports = Vec::new();
        for _ in 0..4 {
            reports.extend(tracker.process_block(&[0.5], true));
        }
        assert_eq!(reports.len(), 1);
        assert_eq!(tracker.state().unwrap().blocks_since_report, 0);

        for _ in 0..3 {
            assert!(tracker.process_block(&[0.5], true).is_none());
        }
        let second = tracker.process_block(&[0.5], true).unwrap();
        assert_eq!(second.sequence, 1);
    }

    #[test]
    fn test_legacy_range_is_always_zero() {
        let mut tracker = configured(1.0, 1);
        let report = tracker.process_block(&[-1.0, 1.0], true).unwrap();
        assert_eq!(report.min_sample, -32767);
        assert_eq!(report.max_sample, 32767);
        assert_eq!(report.range, 0);
    }

    #[test]
    fn test_span_range() {
        let mut tracker = ExtremumTracker::with_policies(ExtremaPolicy::Cumulative, RangeMode::Span);
        tracker.configure(1.0, 1);
        let report = tracker.process_block(&[-0.5, 1.0], true).unwrap();
        assert_eq!(report.range, 32767 - (-16383));
    }

    #[test]
    fn test_span_range_saturates_on_out_of_range_samples() {
        let mut tracker = ExtremumTracker::with_policies(ExtremaPolicy::ResetPerInterval, RangeMode::Span);
        tracker.configure(1.0, 1);

        let report = tracker.process_block(&[70_000.0, -70_000.0], true).unwrap();
        assert_eq!(report.min_sample, i32::MIN);
        assert_eq!(report.max_sample, i32::MAX);
        assert_eq!(report.range, i32::MAX);

        let report = tracker.process_block(&[f32::INFINITY, f32::NEG_INFINITY], true).unwrap();
        assert_eq!(report.min_sample, i32::MIN);
        assert_eq!(report.max_sample, i32::MAX);
        assert_eq!(report.range, i32::MAX);
    }

    #[test]
    fn test_span_range_without_samples_is_zero() {
        let mut tracker = ExtremumTracker::with_policies(ExtremaPolicy::Cumulative, RangeMode::Span);
        tracker.configure(1.0, 1);
        let report = tracker.process_block(&[], true).unwrap();
        assert_eq!(report.min_sample, i32::MAX);
        assert_eq!(report.max_sample, i32::MIN);
        assert_eq!(report.range, 0);
    }

    #[test]
    fn test_cumulative_extrema_survive_reports() {
        let mut tracker = configured(1.0, 1);
        tracker.process_block(&[0.9], true).unwrap();
        let report = tracker.process_block(&[0.1], true).unwrap();
        assert_eq!(report.max_sample, quantize(0.9));
        assert_eq!(report.min_sample, quantize(0.1));
    }

    #[test]
    fn test_reset_per_interval() {
        let mut tracker = ExtremumTracker::with_policies(ExtremaPolicy::ResetPerInterval, RangeMode::Legacy);
        tracker.configure(1.0, 1);
        tracker.process_block(&[0.9, -0.9], true).unwrap();
        let report = tracker.process_block(&[0.1], true).unwrap();
        assert_eq!(report.max_sample, quantize(0.1));
        assert_eq!(report.min_sample, quantize(0.1));
    }

    #[test]
    fn test_reconfigure_discards_previous_stream() {
        let mut tracker = configured(1_000.0, 100);
        tracker.process_block(&[1.0, -1.0], true);
        tracker.process_block(&[1.0, -1.0], true);

        let interval = tracker.configure(48_000.0, 480);
        assert_eq!(interval.blocks, 100);
        let state = tracker.state().unwrap();
        assert_eq!(state.quietest, i32::MAX);
        assert_eq!(state.loudest, i32::MIN);
        assert_eq!(state.blocks_since_report, 0);
        assert_eq!(tracker.reports_emitted(), 0);
    }

    #[test]
    fn test_alternating_full_scale() {
        let mut tracker = configured(48_000.0, 480);
        let block: Vec<f32> = (0..480).map(|i| if i % 2 == 0 { -1.0 } else { 1.0 }).collect();
        tracker.process_block(&block, true);

        let state = tracker.state().unwrap();
        assert_eq!(state.quietest, -32767);
        assert_eq!(state.loudest, 32767);
    }
}
