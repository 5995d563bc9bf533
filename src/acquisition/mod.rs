//! Face region acquisition
//!
//! Locates the skin region the pipeline magnifies in each captured frame.

pub mod face;

pub use face::{detector_from_config, CenteredRegionDetector, FaceDetector, FixedRegionDetector};
