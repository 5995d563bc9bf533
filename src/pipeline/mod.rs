//! Processing Pipeline Module
//!
//! ## Per-Frame Flow
//!
//! ```text
//! FrameSource -> FaceDetector -> MagnificationPipeline -> FrameSink
//!                                        |
//!                          PulseReading -> BpmBuffer / HeartRateSession
//! ```
//!
//! `MagnificationPipeline` is synchronous and owns the circular buffer.
//! `MonitorLoop` drives it from an async source with cooperative
//! cancellation.

mod magnification;
pub mod processing_loop;
pub mod sink;
pub mod source;

pub use magnification::{MagnificationPipeline, PipelineError};
pub use processing_loop::{MonitorLoop, MonitorStats};
pub use sink::{DirectorySink, FrameSink, NullSink};
pub use source::{FrameEvent, FrameSource, ImageSequenceSource, SyntheticConfig, SyntheticSource};
