//! Driftwatch Core Library
//!
//! Clock drift prediction, temporal fingerprinting and message freshness
//! checks for nodes whose oscillators wander.
//!
//! # Features
//!
//! - **Prediction**: AR(1), scalar Kalman and an adaptive model that switches
//!   between AR(1) and linear regimes online
//! - **Compensation**: thermal and aging terms removed before prediction
//! - **Fingerprinting**: SHA-256 digest of an eight-feature drift summary
//! - **Validation**: structural, fingerprint and freshness checks for
//!   temporal messages
//! - **Collection**: fixed-cadence sampling state machine with a ring buffer
//!   and a pluggable log sink
//! - **Synchronization**: beacon-driven offset tracking with an adaptive
//!   resync interval
//!
//! # Module Structure
//!
//! - `engine/` - predictors, model selection, compensation
//! - `fingerprinting/` - feature extraction, digests, distance
//! - `validation/` - temporal message validator
//! - `collector/` - sampling state machine and ring buffer
//! - `hal/` - sensor and clock capability interface
//! - `data/` - shared types, statistics, log sinks
//!
//! # Example
//!
//! ```no_run
//! use dw_core::{generate_fingerprint, DriftPredictor};
//!
//! let mut predictor = DriftPredictor::default();
//! for (i, ppm) in [1.2, 1.3, 1.1].iter().enumerate() {
//!     predictor.update(*ppm, Some(i as f64 * 0.1));
//! }
//! let next = predictor.predict(1, None);
//!
//! let fp = generate_fingerprint(&[1.2, 1.3, 1.1], 30).unwrap();
//! println!("{} {}", next, fp);
//! ```

// Grouped modules
pub mod collector;
pub mod data;
pub mod engine;
pub mod fingerprinting;
pub mod hal;
pub mod validation;

// Standalone modules
pub mod constants;
pub mod error;
pub mod settings;
pub mod simulation;
pub mod sync;

// Re-export primary types from data/
pub use data::{
    CsvDriftLog, DriftLog, DriftSample, EnvironmentSnapshot, LogRecord, MemoryDriftLog,
    WindowStats,
};

// Re-export error types
pub use error::{DriftError, Result};

// Re-export engine types
pub use engine::{
    CompensatedDrift, Compensation, DriftComponents, DriftEstimator, DriftPredictor,
    EnvironmentAwarePredictor, ModelKind, PredictorConfig, RegimeTag, ScalarKalman, ThermalModel,
};

// Re-export fingerprinting
pub use fingerprinting::{
    calculate_fingerprint_distance, fingerprint_distance_hex, fingerprints_consistent,
    generate_fingerprint, generate_fingerprint_hex, nodes_consistent, validate_nodes, FeatureVector, Fingerprint,
    FingerprintSource, NodeHistory,
};

// Re-export validation
pub use validation::{
    create_message, create_message_at, TmbValidator, ValidationOutcome, ValidatorConfig,
};

// Re-export collector
pub use collector::{
    remaining_interval, Collector, CollectorConfig, CollectorState, DriftRingBuffer, SampleSource,
    TickOutcome, TickReport, WindowReport,
};

// Re-export HAL
pub use hal::{
    read_environment, ClockReading, ClockSource, DriftClock, Hal, HostDriftClock, HostHal,
    SimulatedHal, SteppedDriftClock,
};

// Re-export settings functions
pub use settings::{default_settings_path, load_settings, save_settings, DriftSettings};

// Re-export simulation and sync
pub use simulation::{apply_drift_to_clock, DriftProfileSpec, ProfileShape, ReplayOptions};
pub use sync::{BeaconSync, SyncConfig, TimeSynchronizer};
