//! pulsecam: webcam heart-rate estimation
//!
//! Eulerian color magnification of the face region: a Gaussian pyramid
//! reduces each face crop, a circular buffer collects the coarsest level over
//! time, and an FFT bandpass amplifies the heart-rate band before the result
//! is reconstructed and composited back onto the frame.
//!
//! ## Architecture
//!
//! - **processing**: pyramid, frame buffer, frequency mask, temporal bandpass
//! - **pipeline**: per-frame `MagnificationPipeline`, async `MonitorLoop`,
//!   frame sources and sinks
//! - **acquisition**: face region detectors
//! - **heart_rate**: BPM smoothing and session reports
//! - **config**: TOML configuration with validation

pub mod acquisition;
pub mod config;
pub mod heart_rate;
pub mod pipeline;
pub mod processing;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, MonitorConfig};

// Re-export commonly used types
pub use types::{
    BoundingBox, Frame, FrameOutcome, MagnifiedFrame, PipelineStage, PulseReading, Recommendation,
    SessionReport,
};

// Re-export the pipeline
pub use pipeline::{MagnificationPipeline, MonitorLoop, MonitorStats, PipelineError};
pub use processing::ProcessingError;
