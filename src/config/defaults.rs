//! System-wide default constants.
//!
//! Grouped by subsystem. Values that operators are expected to tune live in
//! [`MonitorConfig`](super::MonitorConfig) instead; these are the fallbacks
//! and the knobs of the shipped collaborators.

// ============================================================================
// Config Discovery
// ============================================================================

/// Environment variable holding an explicit config file path.
pub const CONFIG_ENV_VAR: &str = "PULSECAM_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "pulsecam.toml";

// ============================================================================
// Heart Rate
// ============================================================================

/// Smoothing window of displayed BPM values (readings).
pub const BPM_BUFFER_SIZE: usize = 10;

/// Readings outside this range are treated as noise.
pub const MIN_VALID_BPM: f64 = 30.0;
pub const MAX_VALID_BPM: f64 = 200.0;

/// Resting range used for session recommendations.
pub const MIN_RESTING_BPM: f64 = 40.0;
pub const MAX_RESTING_BPM: f64 = 120.0;

/// Interval between periodic session reports while a face stays in view (seconds).
pub const REPORT_INTERVAL_SECS: u64 = 60;

// ============================================================================
// Face Region
// ============================================================================

/// Share of each frame axis covered by the centred face region.
pub const FACE_CENTER_FRACTION: f64 = 0.6;

// ============================================================================
// Synthetic Source
// ============================================================================

/// Pulse rate injected into synthetic frames (beats per minute).
pub const SYNTHETIC_BPM: f64 = 72.0;

/// Frames produced before end of stream. 450 = 30 s at 15 fps.
pub const SYNTHETIC_FRAME_COUNT: u64 = 450;

/// Peak brightness swing of the skin patch (8-bit levels).
pub const SYNTHETIC_PULSE_AMPLITUDE: f64 = 2.0;

/// Standard deviation of per-pixel sensor noise (8-bit levels).
pub const SYNTHETIC_NOISE_STDDEV: f64 = 0.5;

/// Seed for the synthetic noise generator.
pub const SYNTHETIC_SEED: u64 = 0x5eed;

// ============================================================================
// Monitor Loop
// ============================================================================

/// Frames between progress log lines. 150 = 10 s at 15 fps.
pub const PROGRESS_LOG_INTERVAL_FRAMES: u64 = 150;

// ============================================================================
// Output
// ============================================================================

/// Written by `DirectorySink` when the stream closes.
pub const SUMMARY_FILE_NAME: &str = "summary.json";
