//! Audio device enumeration

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use crate::error::AudioError;

/// Audio device information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Identifier used in configuration (the device name)
    pub id: String,

    /// Display name
    pub name: String,

    /// Device can capture
    pub is_input: bool,

    /// Device can play back
    pub is_output: bool,

    /// Device is the host's default input or output
    pub is_default: bool,

    /// Supported input sample rates (range bounds of each supported config)
    pub sample_rates: Vec<u32>,

    /// Supported input channel counts
    pub channels: Vec<u16>,
}

/// Handle to an opened cpal device together with its description
pub struct DeviceHandle {
    info: AudioDevice,
    device: cpal::Device,
}

impl DeviceHandle {
    pub fn info(&self) -> &AudioDevice {
        &self.info
    }

    /// Take the underlying cpal device
    pub fn into_inner(self) -> cpal::Device {
        self.device
    }
}

/// List the input and output devices of the default host
pub fn list_devices() -> Vec<AudioDevice> {
    let host = cpal::default_host();
    let default_input = host.default_input_device().and_then(|d| d.name().ok());
    let default_output = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices: Vec<AudioDevice> = Vec::new();

    let all = match host.devices() {
        Ok(all) => all,
        Err(e) => {
            tracing::warn!("Failed to enumerate audio devices: {}", e);
            return devices;
        }
    };

    for device in all {
        let name = match device.name() {
            Ok(name) => name,
            Err(_) => continue,
        };

        let is_input = device
            .supported_input_configs()
            .map(|mut configs| configs.next().is_some())
            .unwrap_or(false);
        let is_output = device
            .supported_output_configs()
            .map(|mut configs| configs.next().is_some())
            .unwrap_or(false);

        let is_default = default_input.as_deref() == Some(name.as_str())
            || default_output.as_deref() == Some(name.as_str());

        let (sample_rates, channels) = input_capabilities(&device);

        devices.push(AudioDevice {
            id: name.clone(),
            name,
            is_input,
            is_output,
            is_default,
            sample_rates,
            channels,
        });
    }

    devices
}

/// Supported input sample rates and channel counts, sorted and deduplicated
fn input_capabilities(device: &cpal::Device) -> (Vec<u32>, Vec<u16>) {
    let mut sample_rates = Vec::new();
    let mut channels = Vec::new();

    if let Ok(configs) = device.supported_input_configs() {
        for config in configs {
            sample_rates.push(config.min_sample_rate().0);
            sample_rates.push(config.max_sample_rate().0);
            channels.push(config.channels());
        }
    }

    sample_rates.sort_unstable();
    sample_rates.dedup();
    channels.sort_unstable();
    channels.dedup();

    (sample_rates, channels)
}

/// Look up an input device by identifier
pub fn get_device_by_id(id: &str) -> Result<DeviceHandle, AudioError> {
    let host = cpal::default_host();
    let device = host
        .input_devices()?
        .find(|d| d.name().map(|n| n == id).unwrap_or(false))
        .ok_or_else(|| AudioError::DeviceNotFound(id.to_string()))?;

    Ok(handle_for(device, false))
}

/// The host's default input device
pub fn default_input_device() -> Result<DeviceHandle, AudioError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(AudioError::NoInputDevice)?;
    Ok(handle_for(device, true))
}

/// Resolve an optional identifier, falling back to the default input
pub fn resolve_input_device(id: Option<&str>) -> Result<DeviceHandle, AudioError> {
    match id {
        Some(id) if id != "default" => get_device_by_id(id),
        _ => default_input_device(),
    }
}

fn handle_for(device: cpal::Device, is_default: bool) -> DeviceHandle {
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let (sample_rates, channels) = input_capabilities(&device);

    DeviceHandle {
        info: AudioDevice {
            id: name.clone(),
            name,
            is_input: true,
            is_output: false,
            is_default,
            sample_rates,
            channels,
        },
        device,
    }
}
