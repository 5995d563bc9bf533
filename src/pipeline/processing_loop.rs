//! Monitor loop shared by every input mode.
//!
//! One iteration per captured frame: detect the face, track face-present
//! transitions, magnify, feed pulse readings into smoothing and the session,
//! and hand the outcome to the sink. The loop owns the pipeline, so the frame
//! buffer is never shared.

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::magnification::{MagnificationPipeline, PipelineError};
use super::sink::FrameSink;
use super::source::{FrameEvent, FrameSource};
use crate::acquisition::{detector_from_config, FaceDetector};
use crate::config::{defaults::PROGRESS_LOG_INTERVAL_FRAMES, HeartRateConfig, MonitorConfig};
use crate::heart_rate::{BpmBuffer, HeartRateSession};
use crate::types::{FrameOutcome, SessionReport};

// ============================================================================
// Statistics
// ============================================================================

/// Counters returned when the loop exits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorStats {
    pub frames_read: u64,
    pub frames_magnified: u64,
    pub frames_passed_through: u64,
    pub frames_failed: u64,
    /// Pulse readings inside the valid BPM range
    pub readings_accepted: u64,
    pub sessions_reported: u64,
    /// Smoothed BPM at the last frame that had one
    pub last_bpm: Option<f64>,
    /// Set when the source failed instead of reaching end of stream
    pub source_error: Option<String>,
}

impl std::fmt::Display for MonitorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Monitor: {} frames ({} magnified, {} passed through, {} failed), {} readings, {} reports",
            self.frames_read,
            self.frames_magnified,
            self.frames_passed_through,
            self.frames_failed,
            self.readings_accepted,
            self.sessions_reported
        )?;
        if let Some(bpm) = self.last_bpm {
            write!(f, ", last BPM {bpm:.1}")?;
        }
        if let Some(err) = &self.source_error {
            write!(f, ", source failed: {err}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Monitor Loop
// ============================================================================

/// Owns all state needed for the per-frame loop.
///
/// Built with [`new()`](MonitorLoop::new) or
/// [`from_config()`](MonitorLoop::from_config), then consumed by
/// [`run()`](MonitorLoop::run).
pub struct MonitorLoop {
    pipeline: MagnificationPipeline,
    detector: Box<dyn FaceDetector>,
    bpm_buffer: BpmBuffer,
    session: HeartRateSession,
    report_interval_secs: u64,
    cancel_token: CancellationToken,
}

impl MonitorLoop {
    pub fn new(
        pipeline: MagnificationPipeline,
        detector: Box<dyn FaceDetector>,
        heart_rate: &HeartRateConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            detector,
            bpm_buffer: BpmBuffer::new(heart_rate.bpm_buffer_size),
            session: HeartRateSession::new(heart_rate),
            report_interval_secs: heart_rate.report_interval_secs,
            cancel_token,
        }
    }

    /// Pipeline and detector as configured in `config`.
    pub fn from_config(config: &MonitorConfig, cancel_token: CancellationToken) -> Result<Self, PipelineError> {
        let pipeline = MagnificationPipeline::from_config(config)?;
        let detector = detector_from_config(&config.face);
        Ok(Self::new(pipeline, detector, &config.heart_rate, cancel_token))
    }

    /// Run until the source is exhausted, fails, or cancellation.
    ///
    /// The sink is closed on every exit path. Returns final statistics; a
    /// source failure is recorded in [`MonitorStats::source_error`].
    pub async fn run<S, K>(mut self, source: &mut S, sink: &mut K) -> MonitorStats
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let mut stats = MonitorStats::default();
        let mut face_present = false;
        let mut last_timestamp_ms = 0u64;

        info!(source = source.source_name(), "Processing frames");

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!("[MonitorLoop] Shutdown signal received");
                    break;
                }
                result = source.next_frame() => {
                    match result {
                        Ok(ev) => ev,
                        Err(e) => {
                            error!(error = %e, "[MonitorLoop] Source error");
                            stats.source_error = Some(format!("{e:#}"));
                            break;
                        }
                    }
                }
            };

            let frame = match event {
                FrameEvent::Frame(frame) => frame,
                FrameEvent::Eof => {
                    info!(frames = stats.frames_read, "[MonitorLoop] Source reached end");
                    break;
                }
            };

            stats.frames_read += 1;
            let now = frame.timestamp_ms;
            last_timestamp_ms = now;

            let face = self.detector.detect(&frame);
            match (face.is_some(), face_present) {
                (true, false) => {
                    info!(frame = frame.index, "Face detected, session started");
                    self.session.start(now);
                }
                (false, true) => {
                    info!(frame = frame.index, "Face lost, generating session report");
                    deliver_report(self.session.finish(now), sink, &mut stats);
                    self.bpm_buffer.clear();
                }
                _ => {}
            }
            face_present = face.is_some();

            let outcome = self.pipeline.process(frame, face);
            match &outcome {
                FrameOutcome::Magnified(m) => {
                    stats.frames_magnified += 1;
                    if let Some(pulse) = m.pulse {
                        if self.session.record(pulse.bpm, now) {
                            self.bpm_buffer.push(pulse.bpm);
                            stats.readings_accepted += 1;
                        }
                    }
                }
                FrameOutcome::PassThrough(_) => stats.frames_passed_through += 1,
                FrameOutcome::Failed { .. } => stats.frames_failed += 1,
            }

            let smoothed = self.bpm_buffer.average();
            if smoothed.is_some() {
                stats.last_bpm = smoothed;
            }

            if let Err(e) = sink.present(&outcome, smoothed) {
                warn!(frame = outcome.frame().index, error = %e, "Sink failed to present frame");
            }

            if face_present && self.session.is_due(now, self.report_interval_secs) {
                deliver_report(self.session.report(now), sink, &mut stats);
            }

            if stats.frames_read % PROGRESS_LOG_INTERVAL_FRAMES == 0 {
                info!(
                    frames = stats.frames_read,
                    magnified = stats.frames_magnified,
                    buffer_warm = self.pipeline.is_warm(),
                    bpm = ?smoothed.map(|b| (b * 10.0).round() / 10.0),
                    "Progress"
                );
            }
        }

        if self.session.is_active() {
            deliver_report(self.session.finish(last_timestamp_ms), sink, &mut stats);
        }
        if let Err(e) = sink.close() {
            warn!(error = %e, "Failed to close sink");
        }

        info!("{}", stats);
        stats
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn deliver_report<K: FrameSink + ?Sized>(report: Option<SessionReport>, sink: &mut K, stats: &mut MonitorStats) {
    let Some(report) = report else {
        warn!("No valid readings to report");
        return;
    };

    info!(
        average_bpm = report.average_bpm,
        readings = report.readings,
        duration_secs = report.duration_secs,
        "Session report"
    );
    info!("{}", report.recommendation);
    stats.sessions_reported += 1;

    if let Err(e) = sink.session_report(&report) {
        warn!(error = %e, "Sink failed to store session report");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_display() {
        let stats = MonitorStats {
            frames_read: 10,
            frames_magnified: 7,
            frames_passed_through: 2,
            frames_failed: 1,
            readings_accepted: 3,
            sessions_reported: 1,
            last_bpm: Some(72.04),
            source_error: None,
        };
        assert_eq!(
            stats.to_string(),
            "Monitor: 10 frames (7 magnified, 2 passed through, 1 failed), 3 readings, 1 reports, last BPM 72.0"
        );
    }

    #[test]
    fn test_stats_display_without_bpm() {
        let stats = MonitorStats::default();
        assert!(!stats.to_string().contains("BPM"));
        assert!(!stats.to_string().contains("source failed"));
    }

    #[test]
    fn test_stats_display_with_source_error() {
        let stats = MonitorStats {
            frames_read: 4,
            source_error: Some("decoding frame_0004.png".to_string()),
            ..MonitorStats::default()
        };
        assert!(stats.to_string().ends_with(", source failed: decoding frame_0004.png"));
    }
}
