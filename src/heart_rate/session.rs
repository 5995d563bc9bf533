//! Face-present heart-rate session.

use crate::config::HeartRateConfig;
use crate::types::{Recommendation, SessionReport};

/// Accumulates valid readings between reports.
///
/// Times are frame timestamps in milliseconds, so sessions replay
/// identically from recorded input.
#[derive(Debug, Clone)]
pub struct HeartRateSession {
    min_valid_bpm: f64,
    max_valid_bpm: f64,
    min_resting_bpm: f64,
    max_resting_bpm: f64,
    started_at_ms: Option<u64>,
    total_bpm: f64,
    readings: u64,
}

impl HeartRateSession {
    pub fn new(config: &HeartRateConfig) -> Self {
        Self {
            min_valid_bpm: config.min_valid_bpm,
            max_valid_bpm: config.max_valid_bpm,
            min_resting_bpm: config.min_resting_bpm,
            max_resting_bpm: config.max_resting_bpm,
            started_at_ms: None,
            total_bpm: 0.0,
            readings: 0,
        }
    }

    /// Begin a session unless one is already running.
    pub fn start(&mut self, now_ms: u64) {
        if self.started_at_ms.is_none() {
            self.started_at_ms = Some(now_ms);
            self.total_bpm = 0.0;
            self.readings = 0;
        }
    }

    pub fn is_active(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Add a reading if it is plausible. Starts the session if needed.
    ///
    /// Returns whether the reading was accepted.
    pub fn record(&mut self, bpm: f64, now_ms: u64) -> bool {
        if !(bpm >= self.min_valid_bpm && bpm <= self.max_valid_bpm) {
            return false;
        }
        self.start(now_ms);
        self.total_bpm += bpm;
        self.readings += 1;
        true
    }

    pub fn readings(&self) -> u64 {
        self.readings
    }

    pub fn average_bpm(&self) -> Option<f64> {
        (self.readings > 0).then(|| self.total_bpm / self.readings as f64)
    }

    /// Whether `interval_secs` have passed since the session (re)started.
    pub fn is_due(&self, now_ms: u64, interval_secs: u64) -> bool {
        match self.started_at_ms {
            Some(start) => now_ms.saturating_sub(start) >= interval_secs.saturating_mul(1000),
            None => false,
        }
    }

    /// Summarise and restart the window; the session stays active.
    ///
    /// `None` when no valid reading arrived since the last report.
    pub fn report(&mut self, now_ms: u64) -> Option<SessionReport> {
        let start = self.started_at_ms?;
        let report = self.average_bpm().map(|average_bpm| SessionReport {
            average_bpm,
            readings: self.readings,
            duration_secs: now_ms.saturating_sub(start) as f64 / 1000.0,
            recommendation: Recommendation::for_average(
                average_bpm,
                self.min_resting_bpm,
                self.max_resting_bpm,
            ),
        });

        self.started_at_ms = Some(now_ms);
        self.total_bpm = 0.0;
        self.readings = 0;
        report
    }

    /// Summarise and end the session.
    pub fn finish(&mut self, now_ms: u64) -> Option<SessionReport> {
        let report = self.report(now_ms);
        self.started_at_ms = None;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> HeartRateSession {
        HeartRateSession::new(&HeartRateConfig::default())
    }

    #[test]
    fn test_rejects_implausible_readings() {
        let mut session = session();
        assert!(!session.record(25.0, 0));
        assert!(!session.record(250.0, 0));
        assert!(!session.record(f64::NAN, 0));
        assert!(!session.is_active());
        assert!(session.record(72.0, 0));
        assert!(session.is_active());
        assert_eq!(session.readings(), 1);
    }

    #[test]
    fn test_report_averages_and_resets() {
        let mut session = session();
        session.start(1_000);
        session.record(70.0, 2_000);
        session.record(80.0, 3_000);

        let report = session.report(11_000).expect("report");
        assert_eq!(report.average_bpm, 75.0);
        assert_eq!(report.readings, 2);
        assert_eq!(report.duration_secs, 10.0);
        assert_eq!(report.recommendation, Recommendation::Healthy);

        assert!(session.is_active());
        assert_eq!(session.readings(), 0);
        assert!(session.report(12_000).is_none());
    }

    #[test]
    fn test_recommendation_follows_average() {
        let mut session = session();
        session.record(150.0, 0);
        assert_eq!(session.finish(1_000).map(|r| r.recommendation), Some(Recommendation::Relax));

        session.record(35.0, 0);
        assert_eq!(session.finish(1_000).map(|r| r.recommendation), Some(Recommendation::Exercise));
    }

    #[test]
    fn test_finish_ends_session() {
        let mut session = session();
        session.start(0);
        assert!(session.finish(5_000).is_none());
        assert!(!session.is_active());
        assert!(session.finish(6_000).is_none());
    }

    #[test]
    fn test_is_due_after_interval() {
        let mut session = session();
        assert!(!session.is_due(120_000, 60));
        session.start(0);
        assert!(!session.is_due(59_999, 60));
        assert!(session.is_due(60_000, 60));
    }
}
