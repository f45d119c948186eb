//! Append-only drift sample log
//!
//! One CSV line per tick. Every append is flushed so the last complete
//! tick survives a crash.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{DriftError, Result};

/// Fixed header row of every log file
pub const CSV_HEADER: &str = "timestamp,monotonic_elapsed,reference_elapsed,drift_ppm,predicted_drift_ppm";

/// One persisted tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub monotonic_elapsed: f64,
    pub reference_elapsed: f64,
    pub drift_ppm: f64,
    pub predicted_drift_ppm: f64,
}

impl LogRecord {
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{}",
            dw_protocol::format_timestamp(self.timestamp),
            self.monotonic_elapsed,
            self.reference_elapsed,
            self.drift_ppm,
            self.predicted_drift_ppm
        )
    }
}

/// Sink for per-tick records, owned by the collector
#[cfg_attr(test, mockall::automock)]
pub trait DriftLog {
    fn append(&mut self, record: &LogRecord) -> Result<()>;
}

/// CSV file sink
#[derive(Debug)]
pub struct CsvDriftLog {
    path: PathBuf,
    file: File,
}

impl CsvDriftLog {
    /// Create `drift_YYYYmmdd_HHMMSS.csv` inside `dir`, creating the directory if needed
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| DriftError::FileWrite {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let name = format!("drift_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));
        Self::open(&dir.join(name))
    }

    /// Open (or continue) a log at an explicit path
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| DriftError::FileWrite {
                path: path.to_path_buf(),
                source: e,
            })?;

        let is_new = file.metadata().map(|m| m.len() == 0).unwrap_or(true);
        if is_new {
            writeln!(file, "{}", CSV_HEADER).map_err(|e| DriftError::FileWrite {
                path: path.to_path_buf(),
                source: e,
            })?;
            info!("Created drift log {}", path.display());
        } else {
            debug!("Appending to existing drift log {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DriftLog for CsvDriftLog {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        writeln!(self.file, "{}", record.to_csv_line())
            .and_then(|_| self.file.flush())
            .map_err(|e| DriftError::FileWrite {
                path: self.path.clone(),
                source: e,
            })
    }
}

/// In-memory sink for headless runs and tests
#[derive(Debug, Default)]
pub struct MemoryDriftLog {
    pub records: Vec<LogRecord>,
}

impl DriftLog for MemoryDriftLog {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        self.records.push(*record);
        Ok(())
    }
}
