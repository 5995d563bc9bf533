//! Heart-rate readings and session summaries

use serde::{Deserialize, Serialize};

/// Dominant passband frequency of the filtered buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseReading {
    /// FFT bin index within the circular buffer
    pub bin: usize,
    pub frequency_hz: f64,
    pub bpm: f64,
    /// Summed spectral power of the bin across all pixel series
    pub power: f64,
}

impl PulseReading {
    pub fn from_frequency(bin: usize, frequency_hz: f64, power: f64) -> Self {
        Self {
            bin,
            frequency_hz,
            bpm: frequency_hz * 60.0,
            power,
        }
    }
}

/// Advice attached to a session report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Average above the resting ceiling
    Relax,
    /// Average below the resting floor
    Exercise,
    Healthy,
}

impl Recommendation {
    pub fn for_average(average_bpm: f64, min_resting_bpm: f64, max_resting_bpm: f64) -> Self {
        if average_bpm > max_resting_bpm {
            Recommendation::Relax
        } else if average_bpm < min_resting_bpm {
            Recommendation::Exercise
        } else {
            Recommendation::Healthy
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::Relax => "Relax and breathe deeply to lower your heart rate.",
            Recommendation::Exercise => "Try light exercise to raise your heart rate.",
            Recommendation::Healthy => "Heart rate is within a healthy range. Keep it up!",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Summary of one face-present session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub average_bpm: f64,
    pub readings: u64,
    pub duration_secs: f64,
    pub recommendation: Recommendation,
}

impl std::fmt::Display for SessionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Avg BPM: {:.2} over {} readings ({:.1}s). {}",
            self.average_bpm, self.readings, self.duration_secs, self.recommendation
        )
    }
}
