//! Level reports and where they go
//!
//! The audio callback must never block, so the normal path is a
//! [`ChannelSink`] that hands reports to a bounded queue and a
//! [`ReportWriter`] thread that formats and logs them. A full queue drops
//! the report and counts it.

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::REPORT_LOG_TARGET;

/// Summary emitted once per report interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    /// Report number since the stream was configured, starting at 0
    pub sequence: u64,

    /// Quietest quantized sample
    pub min_sample: i32,

    /// Loudest quantized sample
    pub max_sample: i32,

    /// Range as computed by the configured range mode
    pub range: i32,
}

impl fmt::Display for LevelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Audio metrics #{}: min int sample {}, max int sample {}, int range {}",
            self.sequence, self.min_sample, self.max_sample, self.range
        )
    }
}

/// Destination for level reports.
///
/// `emit` is called from the audio thread and must not block.
pub trait ReportSink: Send {
    fn emit(&mut self, report: LevelReport);
}

/// Non-blocking sink that forwards reports over a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<LevelReport>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its queue
    pub fn new(capacity: usize) -> (Self, Receiver<LevelReport>) {
        let (tx, rx) = bounded(capacity.max(1));
        let sink = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, rx)
    }

    /// Shared counter of reports dropped because the queue was full or closed
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }

    /// Reports dropped so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ReportSink for ChannelSink {
    fn emit(&mut self, report: LevelReport) {
        match self.tx.try_send(report) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Output format of the report writer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Human readable line
    #[default]
    Text,
    /// One JSON object per report
    Json,
}

/// Report stamped with the time the writer received it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedReport {
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: LevelReport,
}

impl StampedReport {
    pub fn now(report: LevelReport) -> Self {
        Self {
            received_at: Utc::now(),
            report,
        }
    }

    /// Render in the requested format
    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Text => format!(
                "[{}] {}",
                self.received_at.format("%H:%M:%S%.3f"),
                self.report
            ),
            ReportFormat::Json => serde_json::to_string(self)
                .unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e)),
        }
    }
}

/// Background thread that drains a report queue into the log
pub struct ReportWriter {
    /// Writer thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Running flag
    running: Arc<AtomicBool>,

    /// Reports written counter
    written: Arc<AtomicU64>,
}

impl ReportWriter {
    /// Spawn the writer thread
    pub fn spawn(rx: Receiver<LevelReport>, format: ReportFormat) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let written = Arc::new(AtomicU64::new(0));

        let running_for_loop = running.clone();
        let written_for_loop = written.clone();

        let handle = thread::Builder::new()
            .name("report-writer".to_string())
            .spawn(move || {
                Self::writer_loop(rx, format, running_for_loop, written_for_loop);
            })?;

        Ok(Self {
            thread_handle: Some(handle),
            running,
            written,
        })
    }

    /// Writer loop
    fn writer_loop(
        rx: Receiver<LevelReport>,
        format: ReportFormat,
        running: Arc<AtomicBool>,
        written: Arc<AtomicU64>,
    ) {
        while running.load(Ordering::Relaxed) {
            match rx.recv_timeout(Duration::from_millis(50)) {
                Ok(report) => {
                    Self::write(&StampedReport::now(report), format);
                    written.fetch_add(1, Ordering::Relaxed);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // Flush whatever is still queued
        while let Ok(report) = rx.try_recv() {
            Self::write(&StampedReport::now(report), format);
            written.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn write(stamped: &StampedReport, format: ReportFormat) {
        tracing::info!(target: REPORT_LOG_TARGET, "{}", stamped.render(format));
    }

    /// Stop the writer after flushing queued reports
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Wait for the writer to exit on its own (all senders dropped)
    pub fn join(mut self) {
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Reports written so far
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}

impl Drop for ReportWriter {
    fn drop(&mut self) {
        self.stop();
    }
}
