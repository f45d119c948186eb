//! Data types, statistics, and sample persistence
//!
//! Contains the structures shared by the engine, the fingerprint generator
//! and the collector.

mod log;
pub mod stats;
mod types;

pub use log::{CsvDriftLog, DriftLog, LogRecord, MemoryDriftLog, CSV_HEADER};
pub use types::{DriftSample, EnvironmentSnapshot, WindowStats};

#[cfg(test)]
pub use log::MockDriftLog;
