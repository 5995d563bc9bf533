//! Shared data structures for the heart-rate monitor
//!
//! - `Frame`: decoded camera frame (`rows x cols x channels` of `u8`)
//! - `BoundingBox`: face region reported by a detector
//! - `FrameOutcome`: per-frame result of the magnification pipeline
//! - `PulseReading` / `SessionReport`: heart-rate outputs

mod frame;
mod outcome;
mod heart_rate;

pub use frame::*;
pub use outcome::*;
pub use heart_rate::*;
