//! Unified error handling for Driftwatch
//!
//! This crate provides a single error type used across all Driftwatch components.
//! Numerical degeneracy inside the estimators is never reported through it;
//! only malformed input, I/O and misconfiguration are.

use std::io;
use std::path::PathBuf;

/// Result type alias using DriftError
pub type Result<T> = std::result::Result<T, DriftError>;

/// Unified error type for all Driftwatch operations
#[derive(thiserror::Error, Debug)]
pub enum DriftError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    // ============================================================================
    // Configuration and Settings Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Input Validation Errors
    // ============================================================================
    #[error("Cannot fingerprint an empty sample window")]
    EmptyWindow,

    #[error("Non-finite drift sample at index {index}: {value}")]
    NonFiniteSample {
        index: usize,
        value: f64,
    },

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Missing message section: {0}")]
    MissingSection(String),

    #[error("Missing field {field} in {section}")]
    MissingField {
        section: String,
        field: String,
    },

    #[error("Invalid message timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Message too large: {size} bytes (max {max_size} bytes)")]
    MessageTooLarge {
        size: usize,
        max_size: usize,
    },

    // ============================================================================
    // Simulation Replay Errors
    // ============================================================================
    #[error("Compensation profile length {actual} does not match drift profile length {expected}")]
    ProfileLengthMismatch {
        expected: usize,
        actual: usize,
    },

    // ============================================================================
    // External Source Errors
    // ============================================================================
    #[error("Sample source failed: {0}")]
    SampleSource(String),

    #[error("Sensor read failed: {0}")]
    Sensor(String),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl DriftError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid configuration error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a sensor error from a string
    pub fn sensor(msg: impl Into<String>) -> Self {
        Self::Sensor(msg.into())
    }

    /// Create a sample source error from a string
    pub fn sample_source(msg: impl Into<String>) -> Self {
        Self::SampleSource(msg.into())
    }

    /// Create a missing field error
    pub fn missing_field(section: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            section: section.into(),
            field: field.into(),
        }
    }

    /// True for errors caused by structurally invalid input rather than I/O
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyWindow
                | Self::NonFiniteSample { .. }
                | Self::InvalidFingerprint(_)
                | Self::MissingSection(_)
                | Self::MissingField { .. }
                | Self::InvalidTimestamp(_)
                | Self::MessageTooLarge { .. }
        )
    }
}

// Allow converting from String to DriftError
impl From<String> for DriftError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

// Allow converting from &str to DriftError
impl From<&str> for DriftError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = DriftError::missing_field("header", "fingerprint");
        assert_eq!(err.to_string(), "Missing field fingerprint in header");
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_string_conversion() {
        let err: DriftError = "boom".into();
        assert!(matches!(err, DriftError::Generic(ref s) if s == "boom"));
        assert!(!err.is_malformed_input());
    }
}
