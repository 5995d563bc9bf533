//! Output side of the monitor loop: where processed frames go.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::defaults;
use crate::types::{FrameOutcome, PulseReading, SessionReport};

/// Receives one outcome per tick plus session reports.
///
/// `close` is called exactly once when the loop exits, on every exit path.
pub trait FrameSink: Send {
    fn present(&mut self, outcome: &FrameOutcome, smoothed_bpm: Option<f64>) -> Result<()>;

    fn session_report(&mut self, _report: &SessionReport) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _outcome: &FrameOutcome, _smoothed_bpm: Option<f64>) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Directory Sink
// ============================================================================

/// Per-frame line of `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    pub index: u64,
    pub timestamp_ms: u64,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<PulseReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothed_bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    generated_at: DateTime<Utc>,
    frames: usize,
    sessions: &'a [SessionReport],
    records: &'a [FrameRecord],
}

/// Writes every displayed frame as a numbered PNG and a `summary.json`
/// describing the run when closed.
pub struct DirectorySink {
    dir: PathBuf,
    records: Vec<FrameRecord>,
    sessions: Vec<SessionReport>,
    closed: bool,
}

impl DirectorySink {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        info!(dir = %dir.display(), "Writing processed frames");
        Ok(Self {
            dir: dir.to_path_buf(),
            records: Vec::new(),
            sessions: Vec::new(),
            closed: false,
        })
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }
}

impl FrameSink for DirectorySink {
    fn present(&mut self, outcome: &FrameOutcome, smoothed_bpm: Option<f64>) -> Result<()> {
        let frame = outcome.frame();
        let file = match frame.to_rgb_image() {
            Some(image) => {
                let name = format!("frame_{:06}.png", frame.index);
                let path = self.dir.join(&name);
                image
                    .save(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
                Some(name)
            }
            None => {
                warn!(frame = frame.index, channels = frame.channels(), "Only RGB frames are written as PNG");
                None
            }
        };

        let (signal, error) = match outcome {
            FrameOutcome::Magnified(m) => (Some(m.signal), None),
            FrameOutcome::PassThrough(_) => (None, None),
            FrameOutcome::Failed { stage, error, .. } => (None, Some(format!("{stage}: {error}"))),
        };

        self.records.push(FrameRecord {
            index: frame.index,
            timestamp_ms: frame.timestamp_ms,
            outcome: outcome.kind(),
            file,
            signal,
            pulse: outcome.pulse().copied(),
            smoothed_bpm,
            error,
        });
        Ok(())
    }

    fn session_report(&mut self, report: &SessionReport) -> Result<()> {
        self.sessions.push(report.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let summary = Summary {
            generated_at: Utc::now(),
            frames: self.records.len(),
            sessions: &self.sessions,
            records: &self.records,
        };
        let path = self.dir.join(defaults::SUMMARY_FILE_NAME);
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), frames = self.records.len(), "Run summary written");
        Ok(())
    }
}
