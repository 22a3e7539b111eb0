//! Error types

use thiserror::Error;

/// Crate-level result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while opening or running an audio input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("No default input device available")]
    NoInputDevice,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to enumerate devices: {0}")]
    EnumerationError(String),

    #[error("Channel {channel} out of range, device has {available} input channel(s)")]
    ChannelOutOfRange { channel: usize, available: u16 },

    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    #[error("Failed to build audio stream: {0}")]
    BuildError(String),

    #[error("Failed to start stream: {0}")]
    PlayError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Thread error: {0}")]
    ThreadError(String),
}

impl From<cpal::DevicesError> for AudioError {
    fn from(e: cpal::DevicesError) -> Self {
        AudioError::EnumerationError(e.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for AudioError {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        AudioError::ConfigError(e.to_string())
    }
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(e: cpal::BuildStreamError) -> Self {
        AudioError::BuildError(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(e: cpal::PlayStreamError) -> Self {
        AudioError::PlayError(e.to_string())
    }
}

impl From<cpal::StreamError> for AudioError {
    fn from(e: cpal::StreamError) -> Self {
        AudioError::StreamError(e.to_string())
    }
}
