//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::constants::*;
use crate::monitor::{ExtremaPolicy, RangeMode};
use crate::report::ReportFormat;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Audio input configuration
    pub audio: AudioConfig,

    /// Level tracking configuration
    pub monitor: MonitorConfig,

    /// Report output configuration
    pub report: ReportConfig,
}

/// Audio input configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device identifier (device name), `None` for the system default
    pub device_id: Option<String>,

    /// Channel index analysed within each interleaved frame
    pub channel: usize,

    /// Requested sample rate, `None` to use the device default
    pub sample_rate: Option<u32>,

    /// Requested fixed buffer size in frames, `None` to let the host choose
    pub buffer_size: Option<u32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            channel: DEFAULT_CHANNEL,
            sample_rate: None,
            buffer_size: None,
        }
    }
}

/// Level tracking configuration
///
/// The report interval is not configurable: it is always derived from the
/// stream's sample rate and block size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Whether extrema accumulate for the whole stream or restart after each report
    pub extrema_policy: ExtremaPolicy,

    /// How the reported range is computed
    pub range_mode: RangeMode,

    /// Emit per-block diagnostic trace events
    pub trace_blocks: bool,
}

/// Report output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format of the report writer
    pub format: ReportFormat,

    /// Reports buffered between the audio thread and the writer
    pub queue_capacity: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Text,
            queue_capacity: REPORT_QUEUE_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from `path` if given, else from the default location if a file
    /// exists there, else fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "audio-level-monitor", "level-monitor")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.report.queue_capacity == 0 {
            return Err(crate::Error::Config(
                "report.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.audio.buffer_size == Some(0) {
            return Err(crate::Error::Config(
                "audio.buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.audio.sample_rate == Some(0) {
            return Err(crate::Error::Config(
                "audio.sample_rate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.audio.channel, 0);
        assert_eq!(config.monitor.extrema_policy, ExtremaPolicy::Cumulative);
        assert_eq!(config.monitor.range_mode, RangeMode::Legacy);
        assert!(!config.monitor.trace_blocks);
        assert_eq!(config.report.format, ReportFormat::Text);
        assert_eq!(config.report.queue_capacity, REPORT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [monitor]
            extrema_policy = "reset_per_interval"
            range_mode = "span"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.extrema_policy, ExtremaPolicy::ResetPerInterval);
        assert_eq!(config.monitor.range_mode, RangeMode::Span);
        assert_eq!(config.audio, AudioConfig::default());
        assert_eq!(config.report, ReportConfig::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AppConfig::default();
        config.audio.device_id = Some("USB Microphone".to_string());
        config.audio.buffer_size = Some(480);
        config.report.format = ReportFormat::Json;

        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(AppConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_zero_queue() {
        let err = AppConfig::from_toml("[report]\nqueue_capacity = 0\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_policy() {
        assert!(AppConfig::from_toml("[monitor]\nextrema_policy = \"sometimes\"\n").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("level-monitor-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut config = AppConfig::default();
        config.audio.channel = 1;
        config.monitor.trace_blocks = true;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
