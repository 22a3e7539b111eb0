//! Audio input capability
//!
//! The monitor never looks up devices itself. It is handed to an
//! [`AudioInputSource`], which owns the device and drives the
//! [`AudioCallback`] from its delivery thread.

use crate::error::AudioError;

/// Receiver of audio blocks.
///
/// `prepare` is called whenever the stream is (re)configured and never
/// concurrently with `process`. `process` is called once per delivered
/// block with the samples of a single channel.
pub trait AudioCallback: Send + 'static {
    /// Stream (re)configured with the given sample rate and expected block size
    fn prepare(&mut self, sample_rate: f64, block_size: usize);

    /// One block of samples; `input_available` is false when no live input
    /// is supplying data
    fn process(&mut self, samples: &[f32], input_available: bool);
}

/// Something that can deliver audio blocks to a callback
pub trait AudioInputSource {
    /// Start delivering blocks to `callback`
    fn start(&mut self, callback: Box<dyn AudioCallback>) -> Result<(), AudioError>;

    /// Stop delivery and release the device
    fn stop(&mut self);

    /// Check if the source is delivering
    fn is_running(&self) -> bool;
}
