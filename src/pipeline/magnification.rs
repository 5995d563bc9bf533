//! Per-frame Eulerian color magnification.
//!
//! ```text
//! AwaitingFace -> Cropped -> PyramidBuilt -> BufferWritten
//!              -> Filtered -> Reconstructed -> Composited
//! ```
//!
//! A missing face box ends the tick at `AwaitingFace` with the input frame
//! passed through. Any later failure returns the input frame untouched and
//! names the stage that failed. The buffer cursor advances exactly when the
//! `BufferWritten` step succeeded, regardless of what happens after it.

use ndarray::Array3;
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::config::{MagnificationConfig, MonitorConfig, WebcamConfig};
use crate::processing::{
    dominant_passband_bin, pyramid, FrameBuffer, FrequencyMask, ProcessingError, Pyramid,
    TemporalBandpassFilter,
};
use crate::types::{BoundingBox, Frame, FrameOutcome, MagnifiedFrame, PipelineStage, PulseReading};

/// Construction-time failures. Invalid static configuration is fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Invalid magnification config: {0}")]
    InvalidConfig(String),

    #[error("Pyramid does not fit the working resolution: {0}")]
    InvalidDimensions(#[source] ProcessingError),
}

type StageResult<T> = Result<T, (PipelineStage, ProcessingError)>;

fn at(stage: PipelineStage) -> impl FnOnce(ProcessingError) -> (PipelineStage, ProcessingError) {
    move |e| (stage, e)
}

/// Owns the circular buffer, the passband mask and the planned filter.
#[derive(Debug)]
pub struct MagnificationPipeline {
    webcam: WebcamConfig,
    magnification: MagnificationConfig,
    mask: FrequencyMask,
    filter: TemporalBandpassFilter,
    buffer: FrameBuffer,
}

impl MagnificationPipeline {
    pub fn new(webcam: WebcamConfig, magnification: MagnificationConfig) -> Result<Self, PipelineError> {
        check_config(&webcam, &magnification)?;

        let (rows, cols) = pyramid::level_shape(webcam.video_height, webcam.video_width, magnification.levels)
            .map_err(PipelineError::InvalidDimensions)?;
        let buffer = FrameBuffer::new(magnification.buffer_size, rows, cols, webcam.video_channels)
            .map_err(PipelineError::InvalidDimensions)?;
        let filter = TemporalBandpassFilter::new(magnification.buffer_size)
            .map_err(PipelineError::InvalidDimensions)?;
        let mask = FrequencyMask::from_configs(&webcam, &magnification);

        debug!(
            levels = magnification.levels,
            level_rows = rows,
            level_cols = cols,
            buffer_size = magnification.buffer_size,
            passband_bins = mask.pass_count(),
            "Magnification pipeline ready"
        );

        Ok(Self {
            webcam,
            magnification,
            mask,
            filter,
            buffer,
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, PipelineError> {
        Self::new(config.webcam.clone(), config.magnification.clone())
    }

    /// Run one frame through the state machine.
    pub fn process(&mut self, frame: Frame, face: Option<BoundingBox>) -> FrameOutcome {
        let Some(face) = face else {
            trace!(frame = frame.index, "No face, passing frame through");
            return FrameOutcome::PassThrough(frame);
        };

        let mut written = false;
        let result = self.magnify(&frame, face, &mut written);
        if written {
            self.buffer.advance();
        }

        match result {
            Ok(magnified) => FrameOutcome::Magnified(magnified),
            Err((stage, err)) => {
                error!(
                    frame = frame.index,
                    stage = %stage,
                    face = %face,
                    error = %err,
                    "Magnification failed, showing unmodified frame"
                );
                FrameOutcome::Failed {
                    frame,
                    stage,
                    error: err,
                }
            }
        }
    }

    fn magnify(&mut self, frame: &Frame, face: BoundingBox, written: &mut bool) -> StageResult<MagnifiedFrame> {
        let (width, height) = (self.webcam.video_width, self.webcam.video_height);
        let levels = self.magnification.levels;

        let working = frame
            .crop(&face)
            .and_then(|cropped| cropped.resize(width, height))
            .map_err(at(PipelineStage::Cropped))?;
        let working = working.to_f64();

        let decomposed = Pyramid::build(working.view(), levels).map_err(at(PipelineStage::PyramidBuilt))?;

        self.buffer
            .write(decomposed.deepest())
            .map_err(at(PipelineStage::BufferWritten))?;
        *written = true;
        let slot = self.buffer.write_index();

        let filtered = self
            .filter
            .apply(self.buffer.data(), &self.mask, self.magnification.alpha)
            .map_err(at(PipelineStage::Filtered))?;

        let amplified = filtered
            .slot(slot)
            .ok_or_else(|| {
                ProcessingError::InvalidDimensions(format!("filtered buffer has no slot {slot}"))
            })
            .and_then(|level| pyramid::reconstruct(level, levels, width, height))
            .map_err(at(PipelineStage::Reconstructed))?;

        let composed = composite(&working, &amplified).map_err(at(PipelineStage::Composited))?;
        let output = Frame::from_f64_saturating(composed.view(), frame.index, frame.timestamp_ms);

        let pulse = if self.buffer.is_warm() {
            dominant_passband_bin(&self.mask, filtered.band_power())
                .map(|peak| PulseReading::from_frequency(peak.bin, peak.frequency_hz, peak.power))
        } else {
            None
        };

        Ok(MagnifiedFrame {
            frame: output,
            face,
            buffer_index: slot,
            signal: amplified.mean().unwrap_or(0.0),
            pulse,
        })
    }

    /// Slot the next frame will be written to.
    pub fn write_index(&self) -> usize {
        self.buffer.write_index()
    }

    pub fn samples_written(&self) -> u64 {
        self.buffer.samples_written()
    }

    /// Whether the buffer has been filled once, so pulse readings are available.
    pub fn is_warm(&self) -> bool {
        self.buffer.is_warm()
    }

    pub fn mask(&self) -> &FrequencyMask {
        &self.mask
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn webcam(&self) -> &WebcamConfig {
        &self.webcam
    }

    pub fn magnification(&self) -> &MagnificationConfig {
        &self.magnification
    }
}

fn check_config(webcam: &WebcamConfig, magnification: &MagnificationConfig) -> Result<(), PipelineError> {
    let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

    if webcam.video_frame_rate == 0 {
        return invalid("video_frame_rate must be > 0".to_string());
    }
    if magnification.buffer_size == 0 {
        return invalid("buffer_size must be > 0".to_string());
    }
    if !magnification.alpha.is_finite() {
        return invalid(format!("alpha must be finite, got {}", magnification.alpha));
    }
    let (min, max) = (magnification.min_frequency, magnification.max_frequency);
    if !(min.is_finite() && max.is_finite() && min >= 0.0 && min <= max) {
        return invalid(format!("frequency band must satisfy 0 <= min <= max, got {min}..{max}"));
    }
    Ok(())
}

fn composite(working: &Array3<f64>, amplified: &Array3<f64>) -> Result<Array3<f64>, ProcessingError> {
    if working.dim() != amplified.dim() {
        return Err(ProcessingError::ShapeMismatch {
            expected: working.dim(),
            actual: amplified.dim(),
        });
    }
    Ok(working + amplified)
}

// ============================================================================
// Tests
// ============================================================================
