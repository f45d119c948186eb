//! Fingerprint comparison between nodes

use tracing::info;

use super::digest::{generate_fingerprint, Fingerprint};
use crate::constants::fingerprint as fp_const;
use crate::error::Result;

/// Normalized Hamming distance in [0, 1]
pub fn calculate_fingerprint_distance(a: &Fingerprint, b: &Fingerprint) -> f64 {
    a.hamming(b) as f64 / fp_const::DIGEST_BITS as f64
}

/// Distance between two hex-encoded digests
pub fn fingerprint_distance_hex(a: &str, b: &str) -> Result<f64> {
    Ok(calculate_fingerprint_distance(&a.parse()?, &b.parse()?))
}

/// Strictly below `threshold` counts as consistent
pub fn fingerprints_consistent(a: &Fingerprint, b: &Fingerprint, threshold: f64) -> bool {
    calculate_fingerprint_distance(a, b) < threshold
}

/// Anything able to produce a fingerprint of its current drift history
pub trait FingerprintSource {
    fn label(&self) -> String;

    fn fingerprint(&self) -> Result<Fingerprint>;
}

/// A named, owned drift history snapshot
#[derive(Debug, Clone)]
pub struct NodeHistory {
    pub node_id: String,
    pub samples: Vec<f64>,
    pub window_seconds: usize,
}

impl NodeHistory {
    pub fn new(node_id: impl Into<String>, samples: Vec<f64>) -> Self {
        Self {
            node_id: node_id.into(),
            samples,
            window_seconds: fp_const::WINDOW_SECONDS,
        }
    }
}

impl FingerprintSource for NodeHistory {
    fn label(&self) -> String {
        self.node_id.clone()
    }

    fn fingerprint(&self) -> Result<Fingerprint> {
        generate_fingerprint(&self.samples, self.window_seconds)
    }
}

/// Fingerprint both sources and compare. Errors only when a source cannot
/// produce a fingerprint; a mismatch is `Ok(false)`.
pub fn validate_nodes<A, B>(a: &A, b: &B, threshold: f64) -> Result<bool>
where
    A: FingerprintSource + ?Sized,
    B: FingerprintSource + ?Sized,
{
    let fp_a = a.fingerprint()?;
    let fp_b = b.fingerprint()?;
    let distance = calculate_fingerprint_distance(&fp_a, &fp_b);
    let (hex_a, hex_b) = (fp_a.to_hex(), fp_b.to_hex());
    info!(
        node_a = %a.label(),
        node_b = %b.label(),
        fp_a = &hex_a[..16],
        fp_b = &hex_b[..16],
        distance,
        "Fingerprint distance"
    );
    Ok(distance < threshold)
}

/// [`validate_nodes`] at the default consistency threshold
pub fn nodes_consistent<A, B>(a: &A, b: &B) -> Result<bool>
where
    A: FingerprintSource + ?Sized,
    B: FingerprintSource + ?Sized,
{
    validate_nodes(a, b, fp_const::CONSISTENCY_THRESHOLD)
}
