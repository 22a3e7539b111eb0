//! Audio capture from input devices
//!
//! Builds a cpal input stream on a dedicated thread (streams are not `Send`
//! on every host), extracts the analysed channel from each interleaved
//! buffer and hands it to the [`AudioCallback`].

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::device::{resolve_input_device, AudioDevice};
use crate::audio::source::{AudioCallback, AudioInputSource};
use crate::config::AudioConfig;
use crate::constants::{ERROR_QUEUE_CAPACITY, SCRATCH_HEADROOM};
use crate::error::AudioError;

/// Negotiated stream parameters, known once the first block arrives
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub sample_rate: f64,
    pub block_size: usize,
    pub channels: u16,
}

/// Audio capture from a cpal input device
pub struct CpalInputSource {
    /// Device description
    device: AudioDevice,

    /// Underlying cpal device
    cpal_device: cpal::Device,

    /// Stream configuration
    config: StreamConfig,

    /// Sample format delivered by the device
    sample_format: SampleFormat,

    /// Channel analysed within each frame
    channel: usize,

    /// Whether capture is running
    running: Arc<AtomicBool>,

    /// Set once the device reports it has gone away
    input_lost: Arc<AtomicBool>,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream errors
    error_rx: Option<Receiver<AudioError>>,

    /// Blocks delivered to the callback
    blocks_delivered: Arc<AtomicU64>,

    /// Parameters of the current stream
    stream_info: Arc<RwLock<Option<StreamInfo>>>,
}

impl CpalInputSource {
    /// Open the configured input device
    pub fn new(settings: &AudioConfig) -> Result<Self, AudioError> {
        let handle = resolve_input_device(settings.device_id.as_deref())?;
        let device_info = handle.info().clone();
        let device = handle.into_inner();

        // Get default config and override with requested settings
        let default_config = device.default_input_config()?;

        let config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: settings
                .sample_rate
                .map(cpal::SampleRate)
                .unwrap_or_else(|| default_config.sample_rate()),
            buffer_size: match settings.buffer_size {
                Some(size) => cpal::BufferSize::Fixed(size),
                None => cpal::BufferSize::Default,
            },
        };

        if settings.channel >= config.channels as usize {
            return Err(AudioError::ChannelOutOfRange {
                channel: settings.channel,
                available: config.channels,
            });
        }

        Ok(Self {
            device: device_info,
            cpal_device: device,
            config,
            sample_format: default_config.sample_format(),
            channel: settings.channel,
            running: Arc::new(AtomicBool::new(false)),
            input_lost: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            error_rx: None,
            blocks_delivered: Arc::new(AtomicU64::new(0)),
            stream_info: Arc::new(RwLock::new(None)),
        })
    }

    /// Device description
    pub fn device(&self) -> &AudioDevice {
        &self.device
    }

    /// Parameters of the running stream, once the first block has arrived
    pub fn stream_info(&self) -> Option<StreamInfo> {
        *self.stream_info.read()
    }

    /// Get total blocks delivered
    pub fn blocks_delivered(&self) -> u64 {
        self.blocks_delivered.load(Ordering::Relaxed)
    }

    /// True while the device is supplying data
    pub fn is_input_available(&self) -> bool {
        !self.input_lost.load(Ordering::Relaxed)
    }

    /// Check for errors
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }

    fn capture_thread(
        device: cpal::Device,
        config: StreamConfig,
        sample_format: SampleFormat,
        dispatch: BlockDispatch,
        error_tx: Sender<AudioError>,
        ready_tx: Sender<Result<(), AudioError>>,
        running: Arc<AtomicBool>,
    ) {
        let input_lost = dispatch.input_lost.clone();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, dispatch, error_tx, input_lost),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, dispatch, error_tx, input_lost),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, dispatch, error_tx, input_lost),
            SampleFormat::I32 => build_stream::<i32>(&device, &config, dispatch, error_tx, input_lost),
            other => Err(AudioError::ConfigError(format!("Unsupported sample format {:?}", other))),
        };

        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(e.into()));
            return;
        }
        let _ = ready_tx.send(Ok(()));

        // Keep the stream alive while running
        while running.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(10));
        }

        drop(stream);
        tracing::debug!("Capture stream closed");
    }
}

impl AudioInputSource for CpalInputSource {
    /// Start capture
    fn start(&mut self, callback: Box<dyn AudioCallback>) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (error_tx, error_rx) = bounded::<AudioError>(ERROR_QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        self.error_rx = Some(error_rx);
        self.input_lost.store(false, Ordering::SeqCst);
        *self.stream_info.write() = None;

        let expected_block = match self.config.buffer_size {
            cpal::BufferSize::Fixed(size) => Some(size as usize),
            cpal::BufferSize::Default => None,
        };

        let dispatch = BlockDispatch {
            callback,
            sample_rate: self.config.sample_rate.0 as f64,
            channels: self.config.channels,
            channel: self.channel,
            expected_block,
            prepared: false,
            scratch: Vec::new(),
            input_lost: self.input_lost.clone(),
            blocks_delivered: self.blocks_delivered.clone(),
            stream_info: self.stream_info.clone(),
        };

        let device = self.cpal_device.clone();
        let config = self.config.clone();
        let sample_format = self.sample_format;
        let running = self.running.clone();

        self.running.store(true, Ordering::SeqCst);

        let spawned = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                Self::capture_thread(
                    device,
                    config,
                    sample_format,
                    dispatch,
                    error_tx,
                    ready_tx,
                    running,
                );
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(AudioError::ThreadError(e.to_string()));
            }
        };
        self.thread_handle = Some(handle);

        let started = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(AudioError::ThreadError("Capture thread exited".to_string())));

        match started {
            Ok(()) => {
                tracing::info!(
                    "Capturing from {} ({} Hz, {} channels, analysing channel {})",
                    self.device.name,
                    self.config.sample_rate.0,
                    self.config.channels,
                    self.channel
                );
                Ok(())
            }
            Err(e) => {
                self.stop();
                Err(e)
            }
        }
    }

    /// Stop capture
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if capture is running
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for CpalInputSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the stream's data callback
struct BlockDispatch {
    callback: Box<dyn AudioCallback>,
    sample_rate: f64,
    channels: u16,
    channel: usize,
    expected_block: Option<usize>,
    prepared: bool,
    scratch: Vec<f32>,
    input_lost: Arc<AtomicBool>,
    blocks_delivered: Arc<AtomicU64>,
    stream_info: Arc<RwLock<Option<StreamInfo>>>,
}

impl BlockDispatch {
    fn dispatch<T>(&mut self, data: &[T])
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let channels = self.channels.max(1) as usize;
        let frames = data.len() / channels;

        if !self.prepared {
            // Hosts with a default buffer size only reveal it with the first block
            let block_size = self.expected_block.unwrap_or(frames);
            self.callback.prepare(self.sample_rate, block_size);
            *self.stream_info.write() = Some(StreamInfo {
                sample_rate: self.sample_rate,
                block_size,
                channels: self.channels,
            });
            self.scratch.reserve(scratch_capacity(block_size, frames));
            self.prepared = true;
        }

        // Callback sizes may vary between calls on some hosts; a block larger
        // than the reserved headroom grows the buffer once
        extract_channel(data, channels, self.channel, &mut self.scratch);

        let available = !self.input_lost.load(Ordering::Relaxed) && self.channel < channels;
        self.callback.process(&self.scratch, available);
        self.blocks_delivered.fetch_add(1, Ordering::Relaxed);
    }
}

/// Scratch capacity for a stream: headroom over the larger of the expected
/// and the first delivered block
fn scratch_capacity(expected_block: usize, first_frames: usize) -> usize {
    expected_block.max(first_frames) * SCRATCH_HEADROOM
}

/// Copy one channel of an interleaved buffer into `out` as f32
fn extract_channel<T>(data: &[T], channels: usize, channel: usize, out: &mut Vec<f32>)
where
    T: SizedSample,
    f32: FromSample<T>,
{
    out.clear();
    out.extend(
        data.iter()
            .skip(channel)
            .step_by(channels.max(1))
            .map(|s| f32::from_sample(*s)),
    );
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut dispatch: BlockDispatch,
    error_tx: Sender<AudioError>,
    input_lost: Arc<AtomicBool>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            dispatch.dispatch(data);
        },
        move |err| {
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                input_lost.store(true, Ordering::Relaxed);
            }
            let _ = error_tx.try_send(AudioError::from(err));
        },
        None,
    )?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_capacity_has_headroom() {
        assert_eq!(scratch_capacity(480, 480), 480 * SCRATCH_HEADROOM);
        assert_eq!(scratch_capacity(256, 512), 512 * SCRATCH_HEADROOM);
        assert_eq!(scratch_capacity(1024, 0), 1024 * SCRATCH_HEADROOM);
    }

    #[test]
    fn test_larger_block_within_headroom_keeps_buffer() {
        let mut scratch = Vec::with_capacity(scratch_capacity(4, 4));
        let ptr = scratch.as_ptr();

        // Stereo block twice the expected length
        let data: Vec<f32> = (0..16).map(|i| i as f32).collect();
        extract_channel(&data, 2, 0, &mut scratch);

        assert_eq!(scratch.len(), 8);
        assert_eq!(scratch.as_ptr(), ptr);
    }

    #[test]
    fn test_extract_channel() {
        let data = [0.1f32, -0.1, 0.2, -0.2, 0.3, -0.3];
        let mut out = Vec::new();

        extract_channel(&data, 2, 1, &mut out);
        assert_eq!(out, vec![-0.1, -0.2, -0.3]);

        extract_channel(&data, 2, 0, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_extract_channel_converts_integer_samples() {
        let data = [i16::MAX, 0, i16::MIN, 0];
        let mut out = Vec::new();

        extract_channel(&data, 2, 0, &mut out);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 1.0).abs() < 1e-3);
        assert_eq!(out[1], -1.0);
    }
}
