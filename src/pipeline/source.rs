//! Frame source abstraction for video capture.
//!
//! Provides a unified trait for reading frames from different sources:
//! a directory of still images (recorded sessions) and a synthetic
//! generator with a known pulse rate.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, info};

use crate::config::{defaults, WebcamConfig};
use crate::types::Frame;

/// Events produced by a frame source.
pub enum FrameEvent {
    /// A decoded frame.
    Frame(Frame),
    /// Source has no more frames (end of recording, device closed).
    Eof,
}

/// Trait abstracting where frames come from.
///
/// Implementations handle decoding and pacing internally.
/// The monitor loop calls [`next_frame`](FrameSource::next_frame) in a
/// select! with cancellation.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Read the next frame from the source.
    ///
    /// Returns `FrameEvent::Eof` when no more frames are available.
    /// Returns `Err` on unrecoverable errors (e.g. undecodable file).
    async fn next_frame(&mut self) -> Result<FrameEvent>;

    /// Human-readable name for logging (e.g. "images", "synthetic").
    fn source_name(&self) -> &str;
}

/// Delay between frames at `frame_rate`, or `None` when pacing is off.
fn frame_interval(frame_rate: u32, realtime: bool) -> Option<tokio::time::Duration> {
    (realtime && frame_rate > 0).then(|| tokio::time::Duration::from_secs_f64(1.0 / f64::from(frame_rate)))
}

fn timestamp_ms(index: u64, frame_rate: u32) -> u64 {
    if frame_rate == 0 {
        return 0;
    }
    index * 1000 / u64::from(frame_rate)
}

// ============================================================================
// Image Sequence Source (recorded frames)
// ============================================================================

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Replays PNG/JPEG files from a directory in file-name order.
pub struct ImageSequenceSource {
    files: std::vec::IntoIter<PathBuf>,
    frame_rate: u32,
    interval: Option<tokio::time::Duration>,
    next_index: u64,
}

impl ImageSequenceSource {
    /// List the images in `dir`. Fails if the directory holds none.
    pub fn open(dir: &Path, frame_rate: u32, realtime: bool) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("reading frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        files.sort();

        if files.is_empty() {
            anyhow::bail!("no PNG or JPEG frames in {}", dir.display());
        }
        info!(dir = %dir.display(), frames = files.len(), "Opened image sequence");

        Ok(Self {
            files: files.into_iter(),
            frame_rate,
            interval: frame_interval(frame_rate, realtime),
            next_index: 0,
        })
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

#[async_trait]
impl FrameSource for ImageSequenceSource {
    async fn next_frame(&mut self) -> Result<FrameEvent> {
        // No delay before the first frame
        if let (Some(interval), true) = (self.interval, self.next_index > 0) {
            tokio::time::sleep(interval).await;
        }

        let Some(path) = self.files.next() else {
            return Ok(FrameEvent::Eof);
        };

        let decode_path = path.clone();
        let image = tokio::task::spawn_blocking(move || image::open(&decode_path))
            .await?
            .with_context(|| format!("decoding {}", path.display()))?
            .to_rgb8();

        let index = self.next_index;
        self.next_index += 1;
        debug!(path = %path.display(), index, "Decoded frame");

        let frame = Frame::from_rgb_image(&image, index, timestamp_ms(index, self.frame_rate))?;
        Ok(FrameEvent::Frame(frame))
    }

    fn source_name(&self) -> &str {
        "images"
    }
}

// ============================================================================
// Synthetic Source (known pulse rate)
// ============================================================================

/// Parameters of [`SyntheticSource`].
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub frame_rate: u32,
    /// Pulse rate modulating the skin patch
    pub bpm: f64,
    /// Frames before end of stream
    pub frame_count: u64,
    /// Peak brightness swing of the skin patch (8-bit levels)
    pub pulse_amplitude: f64,
    /// Per-pixel Gaussian noise (8-bit levels)
    pub noise_stddev: f64,
    pub seed: u64,
    /// Sleep between frames to mimic a live camera
    pub realtime: bool,
}

impl SyntheticConfig {
    /// Capture-resolution frames at the configured rate, default pulse.
    pub fn from_webcam(webcam: &WebcamConfig) -> Self {
        Self {
            width: webcam.real_width,
            height: webcam.real_height,
            channels: webcam.video_channels,
            frame_rate: webcam.video_frame_rate,
            bpm: defaults::SYNTHETIC_BPM,
            frame_count: defaults::SYNTHETIC_FRAME_COUNT,
            pulse_amplitude: defaults::SYNTHETIC_PULSE_AMPLITUDE,
            noise_stddev: defaults::SYNTHETIC_NOISE_STDDEV,
            seed: defaults::SYNTHETIC_SEED,
            realtime: false,
        }
    }
}

const BACKGROUND_RGB: [f64; 3] = [45.0, 40.0, 38.0];
const SKIN_RGB: [f64; 3] = [190.0, 140.0, 120.0];

/// Dark frame with a centred skin-coloured patch whose brightness follows
/// a sinusoid at the configured BPM, plus seeded sensor noise.
///
/// The patch covers the middle half of each axis.
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    noise: Option<Normal<f64>>,
    next_index: u64,
    interval: Option<tokio::time::Duration>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 || config.channels == 0 {
            anyhow::bail!(
                "synthetic frames need non-zero extents, got {}x{}x{}",
                config.width,
                config.height,
                config.channels
            );
        }
        if config.frame_rate == 0 {
            anyhow::bail!("synthetic frame rate must be > 0");
        }

        let noise = if config.noise_stddev > 0.0 {
            Some(
                Normal::new(0.0, config.noise_stddev)
                    .with_context(|| format!("invalid noise stddev {}", config.noise_stddev))?,
            )
        } else {
            None
        };

        info!(
            bpm = config.bpm,
            frames = config.frame_count,
            width = config.width,
            height = config.height,
            "Synthetic source ready"
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            interval: frame_interval(config.frame_rate, config.realtime),
            noise,
            next_index: 0,
            config,
        })
    }

    fn render(&mut self, index: u64) -> Frame {
        let c = &self.config;
        let t = index as f64 / f64::from(c.frame_rate);
        let pulse = c.pulse_amplitude * (2.0 * std::f64::consts::PI * c.bpm / 60.0 * t).sin();

        let (row_start, row_end) = (c.height / 4, c.height - c.height / 4);
        let (col_start, col_end) = (c.width / 4, c.width - c.width / 4);

        let rng = &mut self.rng;
        let noise = self.noise;
        let pixels = Array3::from_shape_fn((c.height, c.width, c.channels), |(r, col, ch)| {
            let inside = (row_start..row_end).contains(&r) && (col_start..col_end).contains(&col);
            let base = if inside {
                SKIN_RGB[ch % 3] + pulse
            } else {
                BACKGROUND_RGB[ch % 3]
            };
            let jitter = noise.map(|n| n.sample(rng)).unwrap_or(0.0);
            (base + jitter).round().clamp(0.0, 255.0) as u8
        });

        Frame::new(pixels, index, timestamp_ms(index, c.frame_rate))
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<FrameEvent> {
        if self.next_index >= self.config.frame_count {
            return Ok(FrameEvent::Eof);
        }
        if let (Some(interval), true) = (self.interval, self.next_index > 0) {
            tokio::time::sleep(interval).await;
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(FrameEvent::Frame(self.render(index)))
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SyntheticConfig {
        SyntheticConfig {
            width: 40,
            height: 30,
            channels: 3,
            frame_rate: 15,
            bpm: 90.0,
            frame_count: 3,
            pulse_amplitude: 10.0,
            noise_stddev: 0.0,
            seed: 1,
            realtime: false,
        }
    }

    #[tokio::test]
    async fn test_synthetic_source_ends_after_frame_count() {
        let mut source = SyntheticSource::new(small_config()).expect("source");
        let mut frames = 0;
        while let FrameEvent::Frame(frame) = source.next_frame().await.expect("frame") {
            assert_eq!((frame.width(), frame.height(), frame.channels()), (40, 30, 3));
            assert_eq!(frame.index, frames);
            frames += 1;
        }
        assert_eq!(frames, 3);
    }

    #[tokio::test]
    async fn test_synthetic_patch_pulses() {
        let mut source = SyntheticSource::new(small_config()).expect("source");
        let mut centre = Vec::new();
        while let FrameEvent::Frame(frame) = source.next_frame().await.expect("frame") {
            centre.push(frame.pixels()[[15, 20, 1]]);
            assert_eq!(frame.pixels()[[0, 0, 0]], 45);
        }
        // 1.5 Hz at 15 fps: sin(0), sin(0.2 pi), sin(0.4 pi)
        assert_eq!(centre, vec![140, 146, 150]);
    }

    #[tokio::test]
    async fn test_synthetic_noise_is_seeded() {
        let config = SyntheticConfig {
            noise_stddev: 2.0,
            ..small_config()
        };
        let mut a = SyntheticSource::new(config.clone()).expect("source");
        let mut b = SyntheticSource::new(config).expect("source");

        match (a.next_frame().await.expect("a"), b.next_frame().await.expect("b")) {
            (FrameEvent::Frame(fa), FrameEvent::Frame(fb)) => assert_eq!(fa, fb),
            _ => panic!("expected frames"),
        }
    }

    #[test]
    fn test_invalid_synthetic_config() {
        let config = SyntheticConfig {
            width: 0,
            ..small_config()
        };
        assert!(SyntheticSource::new(config).is_err());
    }

    #[tokio::test]
    async fn test_image_sequence_reads_sorted_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, value) in [("b.png", 20u8), ("a.png", 10u8)] {
            let image = image::RgbImage::from_pixel(8, 6, image::Rgb([value, value, value]));
            image.save(dir.path().join(name)).expect("save");
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let mut source = ImageSequenceSource::open(dir.path(), 15, false).expect("open");
        let mut values = Vec::new();
        while let FrameEvent::Frame(frame) = source.next_frame().await.expect("frame") {
            assert_eq!((frame.width(), frame.height()), (8, 6));
            values.push(frame.pixels()[[0, 0, 0]]);
        }
        assert_eq!(values, vec![10, 20]);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(ImageSequenceSource::open(dir.path(), 15, false).is_err());
    }
}
