//! Temporal Fingerprinting
//!
//! Reduces a drift window to a compact digest so two nodes can check
//! whether their clocks have behaved alike over the same period.
//!
//! # Pipeline
//!
//! 1. **Window**: the trailing `window_seconds * 10` samples (10 Hz)
//! 2. **Features**: mean, median, std, skewness, excess kurtosis, range,
//!    10th and 90th percentile, in that order
//! 3. **Encoding**: each feature as a little-endian f64, 64 bytes total
//! 4. **Digest**: SHA-256, rendered as 64 lowercase hex characters
//!
//! The byte layout is an interoperability contract. Identical input always
//! yields an identical digest.
//!
//! # Comparison
//!
//! Two digests are compared by normalized Hamming distance. This is a fuzzy
//! similarity check, not authentication.

mod digest;
mod distance;
mod features;

pub use digest::{generate_fingerprint, generate_fingerprint_hex, select_window, Fingerprint};
pub use distance::{
    calculate_fingerprint_distance, fingerprint_distance_hex, fingerprints_consistent,
    nodes_consistent, validate_nodes, FingerprintSource, NodeHistory,
};
pub use features::FeatureVector;
