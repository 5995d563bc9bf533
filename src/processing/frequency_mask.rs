//! Heart-rate passband over the temporal FFT bins.

use serde::{Deserialize, Serialize};

use crate::config::{MagnificationConfig, WebcamConfig};

/// Frequency of every FFT bin of the circular buffer, paired with whether the
/// bin lies inside `[min_frequency, max_frequency]`.
///
/// Bin `k` is assigned `frame_rate * k / buffer_size` for the whole range
/// `0..buffer_size`, so the upper half of the spectrum (the negative
/// frequencies of a real signal) reads as high frequencies and is rejected by
/// any heart-rate band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyMask {
    frequencies: Vec<f64>,
    passband: Vec<bool>,
}

impl FrequencyMask {
    pub fn new(frame_rate: f64, buffer_size: usize, min_frequency: f64, max_frequency: f64) -> Self {
        let frequencies: Vec<f64> = (0..buffer_size)
            .map(|k| frame_rate * k as f64 / buffer_size as f64)
            .collect();
        let passband = frequencies
            .iter()
            .map(|&f| f >= min_frequency && f <= max_frequency)
            .collect();

        Self {
            frequencies,
            passband,
        }
    }

    /// Build the mask for a camera / magnification configuration pair.
    pub fn from_configs(webcam: &WebcamConfig, magnification: &MagnificationConfig) -> Self {
        Self::new(
            f64::from(webcam.video_frame_rate),
            magnification.buffer_size,
            magnification.min_frequency,
            magnification.max_frequency,
        )
    }

    /// Number of bins (equals the buffer size).
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn passband(&self) -> &[bool] {
        &self.passband
    }

    /// Whether bin `k` is kept. Out-of-range bins are rejected.
    pub fn passes(&self, k: usize) -> bool {
        self.passband.get(k).copied().unwrap_or(false)
    }

    /// Number of bins inside the passband.
    pub fn pass_count(&self) -> usize {
        self.passband.iter().filter(|&&p| p).count()
    }

    /// A mask with no passing bins filters every signal to zero.
    pub fn is_degenerate(&self) -> bool {
        self.pass_count() == 0
    }

    /// `(bin, frequency)` for every passing bin, in bin order.
    pub fn passband_bins(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.frequencies
            .iter()
            .zip(self.passband.iter())
            .enumerate()
            .filter(|(_, (_, &pass))| pass)
            .map(|(k, (&f, _))| (k, f))
    }

    /// Frequency spacing between neighbouring bins (Hz).
    pub fn resolution(&self) -> f64 {
        match self.frequencies.get(1) {
            Some(&f) => f,
            None => 0.0,
        }
    }
}
