//! Per-frame result of the magnification pipeline

use serde::{Deserialize, Serialize};

use super::{BoundingBox, Frame, PulseReading};
use crate::processing::ProcessingError;

/// Step of the per-frame state machine. Used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    AwaitingFace,
    Cropped,
    PyramidBuilt,
    BufferWritten,
    Filtered,
    Reconstructed,
    Composited,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::AwaitingFace => "awaiting_face",
            PipelineStage::Cropped => "cropped",
            PipelineStage::PyramidBuilt => "pyramid_built",
            PipelineStage::BufferWritten => "buffer_written",
            PipelineStage::Filtered => "filtered",
            PipelineStage::Reconstructed => "reconstructed",
            PipelineStage::Composited => "composited",
        };
        write!(f, "{name}")
    }
}

/// Successful pass through every stage.
#[derive(Debug, Clone)]
pub struct MagnifiedFrame {
    /// Composited frame at working resolution
    pub frame: Frame,
    /// Face box the frame was cropped to
    pub face: BoundingBox,
    /// Buffer slot written by this frame
    pub buffer_index: usize,
    /// Spatial mean of the amplified variation for this slot
    pub signal: f64,
    /// Dominant passband frequency, once the buffer has filled
    pub pulse: Option<PulseReading>,
}

/// What the pipeline did with one input frame.
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    Magnified(MagnifiedFrame),
    /// No face this tick; the input frame, untouched
    PassThrough(Frame),
    /// A stage failed; the input frame, untouched
    Failed {
        frame: Frame,
        stage: PipelineStage,
        error: ProcessingError,
    },
}

impl FrameOutcome {
    /// The frame to display for this tick.
    pub fn frame(&self) -> &Frame {
        match self {
            FrameOutcome::Magnified(m) => &m.frame,
            FrameOutcome::PassThrough(frame) => frame,
            FrameOutcome::Failed { frame, .. } => frame,
        }
    }

    pub fn into_frame(self) -> Frame {
        match self {
            FrameOutcome::Magnified(m) => m.frame,
            FrameOutcome::PassThrough(frame) => frame,
            FrameOutcome::Failed { frame, .. } => frame,
        }
    }

    pub fn is_magnified(&self) -> bool {
        matches!(self, FrameOutcome::Magnified(_))
    }

    pub fn pulse(&self) -> Option<&PulseReading> {
        match self {
            FrameOutcome::Magnified(m) => m.pulse.as_ref(),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FrameOutcome::Magnified(_) => "magnified",
            FrameOutcome::PassThrough(_) => "pass_through",
            FrameOutcome::Failed { .. } => "failed",
        }
    }
}
