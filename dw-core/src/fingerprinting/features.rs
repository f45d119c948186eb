//! Statistical feature extraction over a drift window

use crate::constants::fingerprint as fp_const;
use crate::data::stats;
use crate::error::{DriftError, Result};

/// Fixed-order feature vector:
/// mean, median, std, skewness, excess kurtosis, range, p10, p90
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; fp_const::FEATURE_COUNT]);

impl FeatureVector {
    /// Extract features from a non-empty window of finite samples
    pub fn from_window(window: &[f64]) -> Result<Self> {
        if window.is_empty() {
            return Err(DriftError::EmptyWindow);
        }
        if let Some((index, value)) = window.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DriftError::NonFiniteSample { index, value: *value });
        }

        let sorted = stats::sorted(window);
        let mean = stats::mean(window);
        let (m2, m3, m4) = stats::central_moments(window);

        // Rounding noise on a constant window must not produce huge moments
        let floor = fp_const::ZERO_VARIANCE_RTOL * mean;
        let (skew, kurtosis) = if m2 <= floor * floor {
            (0.0, 0.0)
        } else {
            (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
        };

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];

        Ok(Self([
            mean,
            stats::median_sorted(&sorted),
            m2.sqrt(),
            skew,
            kurtosis,
            max - min,
            stats::percentile_sorted(&sorted, 0.1),
            stats::percentile_sorted(&sorted, 0.9),
        ]))
    }

    /// Little-endian IEEE-754 encoding, features concatenated in order
    pub fn to_le_bytes(&self) -> [u8; fp_const::FEATURE_COUNT * 8] {
        let mut out = [0u8; fp_const::FEATURE_COUNT * 8];
        for (chunk, feature) in out.chunks_exact_mut(8).zip(self.0.iter()) {
            chunk.copy_from_slice(&feature.to_le_bytes());
        }
        out
    }
}
