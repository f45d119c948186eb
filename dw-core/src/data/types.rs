//! Core data types for Driftwatch
//!
//! Defines the sample and snapshot structures passed between the sampling
//! loop, the predictor and the fingerprint generator.

use serde::{Deserialize, Serialize};

use super::stats;

/// One drift measurement. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftSample {
    /// Monotonic seconds since the owning clock started
    pub timestamp: f64,
    pub value_ppm: f64,
}

impl DriftSample {
    pub fn new(timestamp: f64, value_ppm: f64) -> Self {
        Self { timestamp, value_ppm }
    }
}

/// Environmental sensor readings at one instant.
/// `None` means the sensor is absent or its read failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub temperature_c: Option<f64>,
    pub voltage_v: Option<f64>,
}

impl EnvironmentSnapshot {
    pub fn with_temperature(temperature_c: f64) -> Self {
        Self {
            temperature_c: Some(temperature_c),
            voltage_v: None,
        }
    }
}

/// Summary statistics over a full buffer window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl WindowStats {
    /// Returns `None` for an empty slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let (min, max) = stats::min_max(values);
        Some(Self {
            count: values.len(),
            mean: stats::mean(values),
            std: stats::population_std(values),
            min,
            max,
        })
    }
}
