//! Shared constants

/// Scale applied to a normalized sample before truncating to an integer.
/// Maps [-1.0, 1.0] onto the symmetric 16-bit range [-32767, 32767].
pub const SAMPLE_SCALE: f32 = 32767.0;

/// Report interval used when the stream configuration is degenerate
pub const DEFAULT_REPORT_INTERVAL_BLOCKS: u32 = 100;

/// Smallest report interval the tracker will ever use
pub const MIN_REPORT_INTERVAL_BLOCKS: u32 = 1;

/// Channel analysed when none is configured (left / mono)
pub const DEFAULT_CHANNEL: usize = 0;

/// Capacity of the queue between the audio callback and the report writer
pub const REPORT_QUEUE_CAPACITY: usize = 64;

/// Multiple of the expected block size reserved for channel extraction
pub const SCRATCH_HEADROOM: usize = 2;

/// Capacity of the stream error channel
pub const ERROR_QUEUE_CAPACITY: usize = 16;

/// Log target used for emitted level reports
pub const REPORT_LOG_TARGET: &str = "audio_level_monitor::report";
