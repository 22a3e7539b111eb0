//! Audio Level Monitor
//!
//! Captures one channel of an input device and logs the quietest and
//! loudest samples roughly once per second.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_level_monitor::{
    audio::{list_devices, AudioInputSource, CpalInputSource},
    config::AppConfig,
    monitor::{ExtremaPolicy, LevelMonitor, RangeMode},
    report::{ChannelSink, ReportFormat, ReportWriter},
};

/// Log the quietest and loudest input samples once per second
#[derive(Parser, Debug)]
#[command(name = "level-monitor")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to the per-user config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input device name ("default" for the system default)
    #[arg(short, long)]
    device: Option<String>,

    /// Channel index to analyse
    #[arg(long)]
    channel: Option<usize>,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Restart min/max after every report instead of accumulating
    #[arg(long)]
    reset_per_interval: bool,

    /// Report loudest - quietest as the range
    #[arg(long)]
    span_range: bool,

    /// Write reports as JSON lines
    #[arg(long)]
    json: bool,

    /// Trace every scanned block (needs -vv to be visible)
    #[arg(long)]
    trace_blocks: bool,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    write_config: bool,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn default_filter(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "audio_level_monitor=debug,level_monitor=debug,info",
            _ => "audio_level_monitor=trace,level_monitor=trace,info",
        }
    }

    /// Apply command line overrides on top of the file configuration
    fn apply(&self, config: &mut AppConfig) {
        if let Some(device) = &self.device {
            config.audio.device_id = Some(device.clone());
        }
        if let Some(channel) = self.channel {
            config.audio.channel = channel;
        }
        if self.reset_per_interval {
            config.monitor.extrema_policy = ExtremaPolicy::ResetPerInterval;
        }
        if self.span_range {
            config.monitor.range_mode = RangeMode::Span;
        }
        if self.trace_blocks {
            config.monitor.trace_blocks = true;
        }
        if self.json {
            config.report.format = ReportFormat::Json;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.default_filter().into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.list_devices {
        print_devices();
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate()?;

    if args.write_config {
        let path = args
            .config
            .clone()
            .or_else(AppConfig::default_path)
            .context("No configuration path available")?;
        config.save(&path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    tracing::info!("Starting audio level monitor");

    let running = Arc::new(AtomicBool::new(true));
    let running_for_signal = running.clone();
    ctrlc::set_handler(move || {
        running_for_signal.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    let (sink, report_rx) = ChannelSink::new(config.report.queue_capacity);
    let dropped = sink.dropped_counter();
    let mut writer = ReportWriter::spawn(report_rx, config.report.format)
        .context("Failed to start report writer")?;

    let monitor = LevelMonitor::from_config(&config.monitor, sink);

    let mut capture = CpalInputSource::new(&config.audio).context("Failed to open input device")?;
    tracing::debug!("Opened input device {}", capture.device().name);
    capture.start(Box::new(monitor))?;

    tracing::info!("Monitoring - press Ctrl+C to stop");

    let mut last_stats_time = Instant::now();
    let mut announced_stream = false;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));

        if !announced_stream {
            if let Some(info) = capture.stream_info() {
                tracing::debug!(
                    "Stream running: {} Hz, {} samples/block, {} channels",
                    info.sample_rate,
                    info.block_size,
                    info.channels
                );
                announced_stream = true;
            }
        }

        while let Some(e) = capture.check_errors() {
            tracing::warn!("Capture error: {}", e);
        }

        // Periodic stats logging
        if last_stats_time.elapsed() >= Duration::from_secs(30) {
            last_stats_time = Instant::now();
            tracing::debug!(
                "Capture stats: {} blocks delivered, {} reports written, {} dropped, input {}",
                capture.blocks_delivered(),
                writer.written(),
                dropped.load(Ordering::Relaxed),
                if capture.is_input_available() { "available" } else { "lost" },
            );
        }
    }

    tracing::info!("Shutting down");
    capture.stop();
    writer.stop();

    let dropped = dropped.load(Ordering::Relaxed);
    if dropped > 0 {
        tracing::warn!("{} reports were dropped because the writer fell behind", dropped);
    }

    Ok(())
}

fn print_devices() {
    println!("\n=== Available Audio Devices ===");
    for device in list_devices() {
        let device_type = match (device.is_input, device.is_output) {
            (true, true) => "Input/Output",
            (true, false) => "Input",
            (false, true) => "Output",
            _ => "Unknown",
        };
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {} ({}){}:", device.name, device_type, default_marker);
        println!("    ID: {}", device.id);
        println!("    Sample rates: {:?}", device.sample_rates);
        println!("    Channels: {:?}", device.channels);
    }
    println!();
}
