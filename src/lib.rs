//! Audio Level Monitor
//!
//! Opens an audio input stream, scans one channel of every delivered block
//! and periodically reports the quietest and loudest samples seen so far.
//!
//! ```text
//! ┌──────────────────┐  prepare / process   ┌──────────────┐  try_send  ┌──────────────┐
//! │ AudioInputSource │ ───────────────────► │ LevelMonitor │ ─────────► │ ReportWriter │
//! │ (cpal / replay)  │   audio thread       │  (tracker)   │  bounded   │ (log thread) │
//! └──────────────────┘                      └──────────────┘            └──────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod constants;
pub mod error;
pub mod monitor;
pub mod report;

pub use error::{AudioError, Error, Result};
pub use monitor::{ExtremumTracker, LevelMonitor};
pub use report::{LevelReport, ReportSink};
