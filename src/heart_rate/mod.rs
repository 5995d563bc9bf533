//! Heart-Rate Module - BPM smoothing and session reporting
//!
//! The magnification pipeline yields one [`PulseReading`](crate::types::PulseReading)
//! per frame once its buffer is warm. This module turns that stream into
//! something a person can read:
//!
//! - `BpmBuffer`: short circular window averaged for display
//! - `HeartRateSession`: running average while a face stays in view,
//!   summarised into a `SessionReport` with a `Recommendation`
//!
//! ## Usage
//!
//! ```ignore
//! let mut smoothing = BpmBuffer::new(10);
//! let mut session = HeartRateSession::new(&config.heart_rate);
//!
//! session.start(frame.timestamp_ms);
//! if session.record(reading.bpm, frame.timestamp_ms) {
//!     smoothing.push(reading.bpm);
//! }
//! if let Some(report) = session.finish(frame.timestamp_ms) {
//!     info!(%report, "Session complete");
//! }
//! ```

mod bpm_buffer;
mod session;

pub use bpm_buffer::BpmBuffer;
pub use session::HeartRateSession;
