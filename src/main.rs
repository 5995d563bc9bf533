//! pulsecam - webcam heart-rate monitor
//!
//! Magnifies the pulse-driven color change of a face region and reports the
//! heart rate found in it.
//!
//! # Usage
//!
//! ```bash
//! # Synthetic subject with a 72 BPM pulse
//! pulsecam --synthetic
//!
//! # Recorded frames, processed output and summary.json into ./out
//! pulsecam --frames ./recording --output ./out --face 220,120,200,240
//!
//! # Print the effective configuration
//! pulsecam dump-config
//! ```
//!
//! # Environment Variables
//!
//! - `PULSECAM_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use pulsecam::acquisition::{detector_from_config, FaceDetector, FixedRegionDetector};
use pulsecam::config::{defaults, MonitorConfig};
use pulsecam::pipeline::{
    DirectorySink, FrameSink, FrameSource, ImageSequenceSource, MagnificationPipeline, MonitorLoop,
    NullSink, SyntheticConfig, SyntheticSource,
};
use pulsecam::BoundingBox;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pulsecam")]
#[command(about = "Webcam heart-rate estimation via Eulerian color magnification")]
#[command(version)]
struct CliArgs {
    /// Directory of PNG/JPEG frames to process, in file-name order
    #[arg(long, value_name = "DIR", conflicts_with = "synthetic")]
    frames: Option<PathBuf>,

    /// Generate frames of a synthetic subject instead of reading files
    #[arg(long)]
    synthetic: bool,

    /// Pulse rate of the synthetic subject
    #[arg(long, default_value_t = defaults::SYNTHETIC_BPM)]
    synthetic_bpm: f64,

    /// Number of synthetic frames before end of stream
    #[arg(long, default_value_t = defaults::SYNTHETIC_FRAME_COUNT)]
    frame_count: u64,

    /// Write processed frames and summary.json here
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Config file (otherwise $PULSECAM_CONFIG, ./pulsecam.toml, defaults)
    #[arg(long, value_name = "PATH", env = "PULSECAM_CONFIG")]
    config: Option<PathBuf>,

    /// Fixed face region, overriding the configured detector
    #[arg(long, value_name = "X,Y,W,H")]
    face: Option<BoundingBox>,

    /// Pace input at the configured frame rate like a live camera
    #[arg(long)]
    realtime: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Print the effective configuration as TOML
    DumpConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(MonitorConfig::load()),
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(args.config.as_ref())?;

    if let Some(SubCommand::DumpConfig) = args.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let w = &config.webcam;
    let m = &config.magnification;
    info!(
        working = %format!("{}x{}", w.video_width, w.video_height),
        fps = w.video_frame_rate,
        levels = m.levels,
        alpha = m.alpha,
        band_hz = %format!("{:.2}-{:.2}", m.min_frequency, m.max_frequency),
        buffer = m.buffer_size,
        "pulsecam starting"
    );

    let pipeline =
        MagnificationPipeline::from_config(&config).context("invalid magnification setup")?;
    let detector: Box<dyn FaceDetector> = match args.face {
        Some(region) => Box::new(FixedRegionDetector::new(region)),
        None => detector_from_config(&config.face),
    };

    let mut source: Box<dyn FrameSource> = match &args.frames {
        Some(dir) => {
            info!(dir = %dir.display(), "Input: recorded frames");
            Box::new(ImageSequenceSource::open(dir, w.video_frame_rate, args.realtime)?)
        }
        None => {
            if !args.synthetic {
                info!("No --frames given, using the synthetic subject");
            }
            let synthetic = SyntheticConfig {
                bpm: args.synthetic_bpm,
                frame_count: args.frame_count,
                realtime: args.realtime,
                ..SyntheticConfig::from_webcam(w)
            };
            info!(bpm = synthetic.bpm, frames = synthetic.frame_count, "Input: synthetic subject");
            Box::new(SyntheticSource::new(synthetic)?)
        }
    };

    let mut sink: Box<dyn FrameSink> = match &args.output {
        Some(dir) => Box::new(DirectorySink::create(dir)?),
        None => Box::new(NullSink),
    };

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let monitor = MonitorLoop::new(pipeline, detector, &config.heart_rate, cancel_token);
    let stats = monitor.run(source.as_mut(), sink.as_mut()).await;

    match stats.last_bpm {
        Some(bpm) => info!("Estimated heart rate: {bpm:.1} BPM"),
        None => info!("No heart rate estimate (buffer never filled or no face)"),
    }
    if let Some(err) = stats.source_error {
        anyhow::bail!("capture failed after {} frames: {err}", stats.frames_read);
    }
    info!("pulsecam shutdown complete");
    Ok(())
}
