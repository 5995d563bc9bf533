//! Temporal bandpass filtering using rustfft
//!
//! Every `(row, col, channel)` position of the [`FrameBuffer`](super::FrameBuffer)
//! is treated as an independent time series. The series is transformed,
//! bins outside the [`FrequencyMask`] are zeroed, and the inverse transform's
//! real part is scaled by the amplification factor.
//!
//! The whole window is filtered on every frame, so the FFT plans are built
//! once and reused, and series are processed in parallel batches.

use ndarray::{Array2, Array4, ArrayView3, ArrayView4, Axis};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{FrequencyMask, ProcessingError};

/// Pixel series handed to one rayon task.
const SERIES_PER_TASK: usize = 64;

// ============================================================================
// Filter Output
// ============================================================================

/// Amplified, band-limited temporal variation for every buffer slot.
#[derive(Debug, Clone)]
pub struct FilteredBuffer {
    data: Array4<f64>,
    band_power: Vec<f64>,
}

impl FilteredBuffer {
    /// `(time, rows, cols, channels)`, same shape as the input buffer.
    pub fn data(&self) -> ArrayView4<'_, f64> {
        self.data.view()
    }

    pub fn slot(&self, index: usize) -> Option<ArrayView3<'_, f64>> {
        (index < self.data.len_of(Axis(0))).then(|| self.data.index_axis(Axis(0), index))
    }

    /// Spectral power per bin summed over every pixel series.
    ///
    /// Bins outside the passband are always zero.
    pub fn band_power(&self) -> &[f64] {
        &self.band_power
    }

    pub fn into_data(self) -> Array4<f64> {
        self.data
    }
}

/// Strongest passband bin of a [`FilteredBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassbandPeak {
    pub bin: usize,
    pub frequency_hz: f64,
    pub power: f64,
}

/// Find the passband bin carrying the most power.
///
/// Returns `None` when the mask is degenerate or the band carries no energy.
pub fn dominant_passband_bin(mask: &FrequencyMask, band_power: &[f64]) -> Option<PassbandPeak> {
    mask.passband_bins()
        .filter_map(|(bin, frequency_hz)| {
            band_power.get(bin).map(|&power| PassbandPeak {
                bin,
                frequency_hz,
                power,
            })
        })
        .filter(|peak| peak.power > 0.0)
        .max_by(|a, b| a.power.partial_cmp(&b.power).unwrap_or(std::cmp::Ordering::Equal))
}

// ============================================================================
// Filter (Pre-planned for repeated use)
// ============================================================================

/// FFT bandpass along the time axis with pre-planned transforms.
pub struct TemporalBandpassFilter {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    len: usize,
}

impl std::fmt::Debug for TemporalBandpassFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalBandpassFilter")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl TemporalBandpassFilter {
    /// Plan forward and inverse transforms of `len` samples.
    pub fn new(len: usize) -> Result<Self, ProcessingError> {
        if len == 0 {
            return Err(ProcessingError::InvalidDimensions(
                "temporal filter length must be > 0".to_string(),
            ));
        }

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);

        Ok(Self {
            forward,
            inverse,
            len,
        })
    }

    /// Transform length (the buffer's time extent).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Filter every pixel series of `buffer` and scale by `alpha`.
    ///
    /// `buffer` is `(time, rows, cols, channels)`; the time extent must equal
    /// both the planned length and the mask length.
    pub fn apply(
        &self,
        buffer: ArrayView4<f64>,
        mask: &FrequencyMask,
        alpha: f64,
    ) -> Result<FilteredBuffer, ProcessingError> {
        let (samples, rows, cols, channels) = buffer.dim();
        if samples != self.len {
            return Err(ProcessingError::InvalidDimensions(format!(
                "filter planned for {} samples, buffer holds {samples}",
                self.len
            )));
        }
        if mask.len() != samples {
            return Err(ProcessingError::MaskLengthMismatch {
                mask_len: mask.len(),
                samples,
            });
        }

        let series_count = rows * cols * channels;
        if mask.is_degenerate() {
            return Ok(FilteredBuffer {
                data: Array4::zeros((samples, rows, cols, channels)),
                band_power: vec![0.0; samples],
            });
        }

        // Time-major input -> one contiguous complex series per pixel.
        let standard = buffer.as_standard_layout();
        let by_time = standard
            .view()
            .into_shape((samples, series_count))
            .map_err(|e| ProcessingError::InvalidDimensions(e.to_string()))?;

        let mut series = vec![Complex::new(0.0, 0.0); series_count * samples];
        for (t, row) in by_time.outer_iter().enumerate() {
            for (p, &value) in row.iter().enumerate() {
                series[p * samples + t] = Complex::new(value, 0.0);
            }
        }

        let passband = mask.passband();
        let batch_powers: Vec<Vec<f64>> = series
            .par_chunks_mut(samples * SERIES_PER_TASK)
            .map(|batch| {
                let mut power = vec![0.0; samples];
                self.forward.process(batch);
                for spectrum in batch.chunks_mut(samples) {
                    for (k, bin) in spectrum.iter_mut().enumerate() {
                        if passband[k] {
                            power[k] += bin.norm_sqr();
                        } else {
                            *bin = Complex::new(0.0, 0.0);
                        }
                    }
                }
                self.inverse.process(batch);
                power
            })
            .collect();

        let mut band_power = vec![0.0; samples];
        for power in &batch_powers {
            for (total, p) in band_power.iter_mut().zip(power) {
                *total += p;
            }
        }

        // rustfft leaves the inverse unnormalised
        let scale = alpha / samples as f64;
        let mut filtered = Array2::<f64>::zeros((samples, series_count));
        for (p, spectrum) in series.chunks(samples).enumerate() {
            for (t, value) in spectrum.iter().enumerate() {
                filtered[[t, p]] = value.re * scale;
            }
        }

        let data = filtered
            .into_shape((samples, rows, cols, channels))
            .map_err(|e| ProcessingError::InvalidDimensions(e.to_string()))?;

        tracing::trace!(
            samples,
            series = series_count,
            passband_bins = mask.pass_count(),
            "Temporal bandpass applied"
        );

        Ok(FilteredBuffer { data, band_power })
    }
}

// ============================================================================
// Tests
// ============================================================================
