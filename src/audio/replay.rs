//! Deterministic in-memory audio source
//!
//! Replays a scripted sequence of blocks synchronously from `start`.
//! Used by tests and for exercising the monitor without an audio device.

use crate::audio::source::{AudioCallback, AudioInputSource};
use crate::error::AudioError;

/// One scripted delivery
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    /// Stream (re)configured
    Prepare { sample_rate: f64, block_size: usize },
    /// Block delivered
    Block { samples: Vec<f32>, input_available: bool },
}

/// Source that replays [`ReplayEvent`]s in order
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    events: Vec<ReplayEvent>,
    delivered: usize,
    running: bool,
}

impl ReplaySource {
    /// Source whose stream is prepared with the given settings
    pub fn new(sample_rate: f64, block_size: usize) -> Self {
        Self::default().prepare(sample_rate, block_size)
    }

    /// Append a (re)configuration
    pub fn prepare(mut self, sample_rate: f64, block_size: usize) -> Self {
        self.events.push(ReplayEvent::Prepare { sample_rate, block_size });
        self
    }

    /// Append a block delivered with live input
    pub fn block(self, samples: impl Into<Vec<f32>>) -> Self {
        self.block_with_availability(samples, true)
    }

    /// Append a block delivered while no input device is supplying data
    pub fn unavailable_block(self, samples: impl Into<Vec<f32>>) -> Self {
        self.block_with_availability(samples, false)
    }

    /// Append `count` copies of a block
    pub fn repeat_block(mut self, samples: &[f32], count: usize) -> Self {
        for _ in 0..count {
            self = self.block(samples.to_vec());
        }
        self
    }

    fn block_with_availability(mut self, samples: impl Into<Vec<f32>>, input_available: bool) -> Self {
        self.events.push(ReplayEvent::Block {
            samples: samples.into(),
            input_available,
        });
        self
    }

    /// Blocks delivered by the last `start`
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn events(&self) -> &[ReplayEvent] {
        &self.events
    }
}

impl AudioInputSource for ReplaySource {
    fn start(&mut self, mut callback: Box<dyn AudioCallback>) -> Result<(), AudioError> {
        self.running = true;
        self.delivered = 0;

        for event in &self.events {
            match event {
                ReplayEvent::Prepare { sample_rate, block_size } => {
                    callback.prepare(*sample_rate, *block_size);
                }
                ReplayEvent::Block { samples, input_available } => {
                    callback.process(samples, *input_available);
                    self.delivered += 1;
                }
            }
        }

        // Everything has been delivered; dropping the callback releases its sink
        self.running = false;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl AudioCallback for Recorder {
        fn prepare(&mut self, sample_rate: f64, block_size: usize) {
            self.0.lock().push(format!("prepare {} {}", sample_rate, block_size));
        }

        fn process(&mut self, samples: &[f32], input_available: bool) {
            self.0.lock().push(format!("block {} {}", samples.len(), input_available));
        }
    }

    #[test]
    fn test_replays_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut source = ReplaySource::new(48_000.0, 2)
            .block(vec![0.1, 0.2])
            .unavailable_block(vec![0.3])
            .prepare(44_100.0, 4)
            .repeat_block(&[0.0; 4], 2);

        source.start(Box::new(Recorder(log.clone()))).unwrap();

        assert_eq!(source.delivered(), 4);
        assert!(!source.is_running());
        assert_eq!(
            *log.lock(),
            vec![
                "prepare 48000 2",
                "block 2 true",
                "block 1 false",
                "prepare 44100 4",
                "block 4 true",
                "block 4 true",
            ]
        );
    }
}
