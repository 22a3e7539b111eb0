//! Audio input subsystem
//!
//! Device enumeration, the input capability the monitor is driven by, and
//! its cpal and in-memory implementations.

pub mod capture;
pub mod device;
pub mod replay;
pub mod source;

pub use capture::{CpalInputSource, StreamInfo};
pub use device::{default_input_device, get_device_by_id, list_devices, AudioDevice, DeviceHandle};
pub use replay::{ReplayEvent, ReplaySource};
pub use source::{AudioCallback, AudioInputSource};
