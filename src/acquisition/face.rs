//! Face region detection
//!
//! The pipeline only needs "zero or one box per frame". Real detectors plug
//! in through [`FaceDetector`]; the shipped ones select a fixed or centred
//! region, which is enough for a subject sitting still in front of the camera.

use tracing::debug;

use crate::config::{FaceConfig, FaceDetectorKind};
use crate::types::{BoundingBox, Frame};

/// Produces the face box for a frame, or `None` if no face is visible.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Option<BoundingBox>;
}

impl<F> FaceDetector for F
where
    F: FnMut(&Frame) -> Option<BoundingBox> + Send,
{
    fn detect(&mut self, frame: &Frame) -> Option<BoundingBox> {
        self(frame)
    }
}

// ============================================================================
// Fixed Region
// ============================================================================

/// Always reports the same box, as long as it overlaps the frame.
#[derive(Debug, Clone)]
pub struct FixedRegionDetector {
    region: BoundingBox,
}

impl FixedRegionDetector {
    pub fn new(region: BoundingBox) -> Self {
        Self { region }
    }
}

impl FaceDetector for FixedRegionDetector {
    fn detect(&mut self, frame: &Frame) -> Option<BoundingBox> {
        self.region
            .clamp_to(frame.width(), frame.height())
            .map(|_| self.region)
    }
}

// ============================================================================
// Centred Region
// ============================================================================

/// Reports a box covering `fraction` of each axis, centred in the frame.
#[derive(Debug, Clone)]
pub struct CenteredRegionDetector {
    fraction: f64,
}

impl CenteredRegionDetector {
    /// `fraction` is clamped to `(0, 1]`.
    pub fn new(fraction: f64) -> Self {
        let fraction = if fraction.is_finite() && fraction > 0.0 {
            fraction.min(1.0)
        } else {
            1.0
        };
        Self { fraction }
    }
}

impl FaceDetector for CenteredRegionDetector {
    fn detect(&mut self, frame: &Frame) -> Option<BoundingBox> {
        if frame.is_empty() {
            return None;
        }
        let width = ((frame.width() as f64 * self.fraction).round() as usize).max(1);
        let height = ((frame.height() as f64 * self.fraction).round() as usize).max(1);
        let x = (frame.width() - width) / 2;
        let y = (frame.height() - height) / 2;
        Some(BoundingBox::new(x as i64, y as i64, width as u32, height as u32))
    }
}

/// Build the detector selected in `[face]`.
pub fn detector_from_config(config: &FaceConfig) -> Box<dyn FaceDetector> {
    match (config.detector, config.fixed_region) {
        (FaceDetectorKind::Fixed, Some(region)) => {
            debug!(region = %region, "Using fixed face region");
            Box::new(FixedRegionDetector::new(region))
        }
        (FaceDetectorKind::Fixed, None) => {
            debug!("Fixed face detector without a region, using full frame");
            Box::new(CenteredRegionDetector::new(1.0))
        }
        (FaceDetectorKind::Centered, _) => {
            debug!(fraction = config.center_fraction, "Using centred face region");
            Box::new(CenteredRegionDetector::new(config.center_fraction))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_region() {
        let frame = Frame::filled(640, 480, 3, 0);
        let mut detector = CenteredRegionDetector::new(0.5);
        assert_eq!(detector.detect(&frame), Some(BoundingBox::new(160, 120, 320, 240)));
    }

    #[test]
    fn test_centered_full_frame() {
        let frame = Frame::filled(160, 120, 3, 0);
        let mut detector = CenteredRegionDetector::new(7.0);
        assert_eq!(detector.detect(&frame), Some(BoundingBox::new(0, 0, 160, 120)));
    }

    #[test]
    fn test_fixed_region_outside_frame_is_no_face() {
        let frame = Frame::filled(100, 100, 3, 0);
        let mut inside = FixedRegionDetector::new(BoundingBox::new(10, 10, 20, 20));
        let mut outside = FixedRegionDetector::new(BoundingBox::new(200, 10, 20, 20));

        assert!(inside.detect(&frame).is_some());
        assert!(outside.detect(&frame).is_none());
    }

    #[test]
    fn test_closure_detector() {
        let frame = Frame::filled(10, 10, 3, 0);
        let mut calls = 0;
        let mut detector = |_: &Frame| -> Option<BoundingBox> {
            calls += 1;
            None
        };
        assert!(FaceDetector::detect(&mut detector, &frame).is_none());
        drop(detector);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_detector_from_config() {
        let frame = Frame::filled(100, 100, 3, 0);
        let config = FaceConfig {
            detector: FaceDetectorKind::Fixed,
            center_fraction: 0.5,
            fixed_region: Some(BoundingBox::new(1, 2, 3, 4)),
        };
        let mut detector = detector_from_config(&config);
        assert_eq!(detector.detect(&frame), Some(BoundingBox::new(1, 2, 3, 4)));
    }
}
