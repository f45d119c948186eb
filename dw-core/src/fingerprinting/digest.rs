//! 256-bit temporal fingerprint

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use super::features::FeatureVector;
use crate::constants::fingerprint as fp_const;
use crate::error::{DriftError, Result};

/// SHA-256 digest of a drift window's feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, 64 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Number of differing bits
    pub fn hamming(&self, other: &Fingerprint) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| DriftError::InvalidFingerprint(format!("{:?}: {}", s, e)))?;
        Ok(Self(bytes))
    }
}

/// Trailing `window_seconds * SAMPLES_PER_SECOND` samples, or all of them
pub fn select_window(samples: &[f64], window_seconds: usize) -> &[f64] {
    let wanted = window_seconds.saturating_mul(fp_const::SAMPLES_PER_SECOND);
    &samples[samples.len().saturating_sub(wanted)..]
}

/// Fingerprint the trailing window of `samples`.
///
/// Short histories are fingerprinted whole and are statistically weaker.
pub fn generate_fingerprint(samples: &[f64], window_seconds: usize) -> Result<Fingerprint> {
    let window = select_window(samples, window_seconds);
    let features = FeatureVector::from_window(window)?;

    let mut hasher = Sha256::new();
    hasher.update(features.to_le_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Ok(Fingerprint(bytes))
}

/// [`generate_fingerprint`] rendered as hex
pub fn generate_fingerprint_hex(samples: &[f64], window_seconds: usize) -> Result<String> {
    generate_fingerprint(samples, window_seconds).map(|fp| fp.to_hex())
}
