//! Monitor Configuration - capture, magnification and heart-rate settings as TOML
//!
//! Every struct implements `Default` with the reference values, so a missing
//! or partial config file behaves exactly like the built-in settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::processing::pyramid;
use crate::types::BoundingBox;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration of the heart-rate monitor.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$PULSECAM_CONFIG` env var
/// 2. `./pulsecam.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Capture and working resolution
    #[serde(default)]
    pub webcam: WebcamConfig,

    /// Pyramid depth, amplification and passband
    #[serde(default)]
    pub magnification: MagnificationConfig,

    /// BPM smoothing and session reporting
    #[serde(default)]
    pub heart_rate: HeartRateConfig,

    /// Face region selection
    #[serde(default)]
    pub face: FaceConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PULSECAM_CONFIG` environment variable
    /// 2. `./pulsecam.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded monitor config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded monitor config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", defaults::LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate TOML text.
    ///
    /// Unknown keys only warn; parse and validation failures are errors.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in &super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Monitor config saved");
        Ok(())
    }

    /// Validate every section for internal consistency.
    ///
    /// Collects all problems before failing so a broken file is fixed in one
    /// pass. Suspicious but usable values are logged as warnings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.webcam;
        let m = &self.magnification;
        let h = &self.heart_rate;
        let mut errors: Vec<String> = Vec::new();

        if w.video_frame_rate == 0 {
            errors.push("webcam.video_frame_rate must be > 0".to_string());
        }
        if w.video_width == 0 || w.video_height == 0 {
            errors.push(format!(
                "webcam.video_width x video_height must be non-zero (got {}x{})",
                w.video_width, w.video_height
            ));
        }
        if w.video_channels == 0 {
            errors.push("webcam.video_channels must be > 0".to_string());
        }
        if m.buffer_size == 0 {
            errors.push("magnification.buffer_size must be > 0".to_string());
        }

        if !m.alpha.is_finite() {
            errors.push(format!("magnification.alpha must be finite (got {})", m.alpha));
        }
        if !m.min_frequency.is_finite() || !m.max_frequency.is_finite() {
            errors.push(format!(
                "magnification: frequencies must be finite (got min={}, max={})",
                m.min_frequency, m.max_frequency
            ));
        } else {
            if m.min_frequency < 0.0 {
                errors.push(format!(
                    "magnification.min_frequency ({:.3}) cannot be negative",
                    m.min_frequency
                ));
            }
            if m.min_frequency > m.max_frequency {
                errors.push(format!(
                    "magnification.min_frequency ({:.3}) must be <= max_frequency ({:.3})",
                    m.min_frequency, m.max_frequency
                ));
            }
        }

        if w.video_width > 0 && w.video_height > 0 {
            if let Err(e) = pyramid::level_shape(w.video_height, w.video_width, m.levels) {
                errors.push(format!("magnification.levels = {}: {e}", m.levels));
            }
        }

        if h.bpm_buffer_size == 0 {
            errors.push("heart_rate.bpm_buffer_size must be > 0".to_string());
        }
        if h.report_interval_secs == 0 {
            errors.push("heart_rate.report_interval_secs must be > 0".to_string());
        }
        Self::check_ordered(h.min_valid_bpm, h.max_valid_bpm, "heart_rate.valid_bpm", &mut errors);
        Self::check_ordered(h.min_resting_bpm, h.max_resting_bpm, "heart_rate.resting_bpm", &mut errors);

        let f = &self.face;
        if !(f.center_fraction > 0.0 && f.center_fraction <= 1.0) {
            errors.push(format!(
                "face.center_fraction = {} must be in (0, 1]",
                f.center_fraction
            ));
        }
        if f.detector == FaceDetectorKind::Fixed {
            match f.fixed_region {
                None => errors.push("face.detector = \"fixed\" requires [face.fixed_region]".to_string()),
                Some(r) if r.width == 0 || r.height == 0 => {
                    errors.push(format!("face.fixed_region {r} has zero area"));
                }
                Some(_) => {}
            }
        }

        let (range_errors, range_warnings) = super::validation::validate_signal_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_ordered(min: f64, max: f64, name: &str, errors: &mut Vec<String>) {
        if !min.is_finite() || !max.is_finite() {
            errors.push(format!("{name}: values must be finite (got min={min}, max={max})"));
            return;
        }
        if min > max {
            errors.push(format!("{name}: min ({min:.1}) must be <= max ({max:.1})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[source] toml::ser::Error),

    #[error("Config validation failed:\n{}", format_problems(.0))]
    Validation(Vec<String>),
}

fn format_problems(problems: &[String]) -> String {
    problems
        .iter()
        .map(|p| format!("  - {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Webcam
// ============================================================================

/// Capture resolution and the working resolution the face crop is resized to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebcamConfig {
    /// Capture width requested from the camera (px)
    #[serde(default = "default_real_width")]
    pub real_width: usize,

    /// Capture height requested from the camera (px)
    #[serde(default = "default_real_height")]
    pub real_height: usize,

    /// Working width of the face crop (px)
    #[serde(default = "default_video_width")]
    pub video_width: usize,

    /// Working height of the face crop (px)
    #[serde(default = "default_video_height")]
    pub video_height: usize,

    #[serde(default = "default_video_channels")]
    pub video_channels: usize,

    /// Capture rate (frames per second); sets the FFT bin spacing
    #[serde(default = "default_video_frame_rate")]
    pub video_frame_rate: u32,
}

fn default_real_width() -> usize { 640 }
fn default_real_height() -> usize { 480 }
fn default_video_width() -> usize { 160 }
fn default_video_height() -> usize { 120 }
fn default_video_channels() -> usize { 3 }
fn default_video_frame_rate() -> u32 { 15 }

impl Default for WebcamConfig {
    fn default() -> Self {
        Self {
            real_width: default_real_width(),
            real_height: default_real_height(),
            video_width: default_video_width(),
            video_height: default_video_height(),
            video_channels: default_video_channels(),
            video_frame_rate: default_video_frame_rate(),
        }
    }
}

// ============================================================================
// Magnification
// ============================================================================

/// Eulerian color magnification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnificationConfig {
    /// Pyramid downsampling steps
    #[serde(default = "default_levels")]
    pub levels: usize,

    /// Amplification applied to the band-limited variation
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Lower passband edge (Hz)
    #[serde(default = "default_min_frequency")]
    pub min_frequency: f64,

    /// Upper passband edge (Hz)
    #[serde(default = "default_max_frequency")]
    pub max_frequency: f64,

    /// Circular buffer length (frames); also the FFT length
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_levels() -> usize { 3 }
fn default_alpha() -> f64 { 170.0 }
fn default_min_frequency() -> f64 { 1.0 }
fn default_max_frequency() -> f64 { 2.0 }
fn default_buffer_size() -> usize { 150 }

impl Default for MagnificationConfig {
    fn default() -> Self {
        Self {
            levels: default_levels(),
            alpha: default_alpha(),
            min_frequency: default_min_frequency(),
            max_frequency: default_max_frequency(),
            buffer_size: default_buffer_size(),
        }
    }
}

// ============================================================================
// Heart Rate
// ============================================================================

/// BPM smoothing, plausibility bounds and session reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateConfig {
    #[serde(default = "default_bpm_buffer_size")]
    pub bpm_buffer_size: usize,

    /// Readings below this are discarded
    #[serde(default = "default_min_valid_bpm")]
    pub min_valid_bpm: f64,

    /// Readings above this are discarded
    #[serde(default = "default_max_valid_bpm")]
    pub max_valid_bpm: f64,

    /// Session averages below this recommend exercise
    #[serde(default = "default_min_resting_bpm")]
    pub min_resting_bpm: f64,

    /// Session averages above this recommend relaxing
    #[serde(default = "default_max_resting_bpm")]
    pub max_resting_bpm: f64,

    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
}

fn default_bpm_buffer_size() -> usize { defaults::BPM_BUFFER_SIZE }
fn default_min_valid_bpm() -> f64 { defaults::MIN_VALID_BPM }
fn default_max_valid_bpm() -> f64 { defaults::MAX_VALID_BPM }
fn default_min_resting_bpm() -> f64 { defaults::MIN_RESTING_BPM }
fn default_max_resting_bpm() -> f64 { defaults::MAX_RESTING_BPM }
fn default_report_interval_secs() -> u64 { defaults::REPORT_INTERVAL_SECS }

impl Default for HeartRateConfig {
    fn default() -> Self {
        Self {
            bpm_buffer_size: default_bpm_buffer_size(),
            min_valid_bpm: default_min_valid_bpm(),
            max_valid_bpm: default_max_valid_bpm(),
            min_resting_bpm: default_min_resting_bpm(),
            max_resting_bpm: default_max_resting_bpm(),
            report_interval_secs: default_report_interval_secs(),
        }
    }
}

// ============================================================================
// Face Region
// ============================================================================

/// Which shipped detector supplies the face box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceDetectorKind {
    /// Centred fraction of every frame
    #[default]
    Centered,
    /// The configured `fixed_region`
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceConfig {
    #[serde(default)]
    pub detector: FaceDetectorKind,

    /// Share of each axis covered by the centred region
    #[serde(default = "default_center_fraction")]
    pub center_fraction: f64,

    /// Box used by the fixed detector (frame-pixel coordinates)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_region: Option<BoundingBox>,
}

fn default_center_fraction() -> f64 { defaults::FACE_CENTER_FRACTION }

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            detector: FaceDetectorKind::default(),
            center_fraction: default_center_fraction(),
            fixed_region: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
