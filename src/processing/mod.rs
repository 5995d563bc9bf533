//! Numerical core of the color-magnification pipeline.
//!
//! - [`FrequencyMask`]: passband selector over the temporal FFT bins
//! - [`pyramid`]: Gaussian pyramid build / reconstruct
//! - [`FrameBuffer`]: circular store of one pyramid level per frame
//! - [`TemporalBandpassFilter`]: FFT-domain bandpass along the time axis

mod bandpass;
mod frame_buffer;
mod frequency_mask;
pub mod pyramid;

pub use bandpass::{dominant_passband_bin, FilteredBuffer, PassbandPeak, TemporalBandpassFilter};
pub use frame_buffer::FrameBuffer;
pub use frequency_mask::FrequencyMask;
pub use pyramid::Pyramid;

use thiserror::Error;

/// Errors raised by the numerical core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("Frequency mask has {mask_len} bins but the buffer holds {samples} samples")]
    MaskLengthMismatch { mask_len: usize, samples: usize },

    #[error("Region {x},{y} {width}x{height} does not intersect the {frame_width}x{frame_height} frame")]
    RegionOutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        frame_width: usize,
        frame_height: usize,
    },

    #[error("Frame has no pixels")]
    EmptyFrame,
}
