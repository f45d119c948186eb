//! Constants and configuration values for Driftwatch
//!
//! Centralizes all magic numbers, paths, and configuration defaults.
//! This is the SINGLE SOURCE OF TRUTH for all configuration values.
//! Never use magic numbers in other files - add them here first.

use std::time::Duration;

/// System paths
pub mod paths {
    /// Application directory name under the user config dir
    pub const APP_DIR: &str = "driftwatch";

    /// Settings file name
    pub const SETTINGS_FILE: &str = "settings.json";

    /// Default directory for drift CSV logs, relative to the working directory
    pub const LOG_DIR: &str = "logs";

    /// Glob-free prefix of thermal zones exposed by the kernel
    pub const THERMAL_ZONE_BASE: &str = "/sys/class/thermal";

    /// User configuration directory (`$XDG_CONFIG_HOME/driftwatch` or equivalent)
    pub fn user_config_dir() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR))
    }
}

/// Sample conditioning and predictor defaults
pub mod predictor {
    /// Lowest drift value ever stored, in ppm
    pub const PPM_FLOOR: f64 = -70.0;

    /// History std above which the newest sample is pulled toward the mean
    pub const OUTLIER_STD_THRESHOLD: f64 = 1.0;

    /// Maximum distance (in ppm) a pulled-in sample may sit from the mean
    pub const OUTLIER_MAX_DEVIATION: f64 = 1.0;

    /// Trailing window used for the regression phi estimate
    pub const PHI_WINDOW: usize = 10;

    /// Bound on |phi|
    pub const PHI_LIMIT: f64 = 0.999;

    /// EMA weight of the newest raw phi
    pub const PHI_SMOOTHING: f64 = 0.5;

    /// Maximum retained history (older samples are dropped)
    pub const HISTORY_CAPACITY: usize = 1000;

    /// Kalman process noise Q
    pub const PROCESS_VARIANCE: f64 = 0.1;

    /// Kalman measurement noise R
    pub const MEASUREMENT_VARIANCE: f64 = 1.0;

    /// Kalman covariance after construction or reset
    pub const INITIAL_COVARIANCE: f64 = 1.0;

    /// Model-selection window capacity
    pub const SELECTION_WINDOW: usize = 50;

    /// Samples required before a regime is chosen
    pub const SELECTION_MIN_SAMPLES: usize = 10;

    /// Autocorrelation above which the AR(1) regime is chosen
    pub const AUTOCORR_THRESHOLD: f64 = 0.9;

    /// Denominators smaller than this are treated as zero
    pub const EPSILON: f64 = 1e-10;
}

/// Temporal fingerprint parameters
pub mod fingerprint {
    /// Assumed sampling rate used to turn seconds into a sample count
    pub const SAMPLES_PER_SECOND: usize = 10;

    /// Default fingerprint window in seconds
    pub const WINDOW_SECONDS: usize = 30;

    /// Number of features in the serialized vector
    pub const FEATURE_COUNT: usize = 8;

    /// Digest size in bits
    pub const DIGEST_BITS: usize = 256;

    /// Normalized Hamming distance below which two nodes are consistent
    pub const CONSISTENCY_THRESHOLD: f64 = 0.1;

    /// Relative variance floor for the skew/kurtosis terms
    pub const ZERO_VARIANCE_RTOL: f64 = 1e-15;
}

/// Message validator defaults
pub mod validator {
    /// Maximum tolerated drift in ppm
    pub const MAX_DRIFT_PPM: f64 = 50.0;

    /// Validation window in seconds
    pub const WINDOW_SECONDS: usize = 30;
}

/// Sampling loop timing
pub mod collector {
    use super::Duration;

    /// Default tick interval (10 Hz)
    pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

    /// Samples discarded before steady state
    pub const WARMUP_SAMPLES: usize = 10;

    /// Ring buffer capacity (10 minutes at 100 ms)
    pub const BUFFER_CAPACITY: usize = 6000;

    /// Drift readings above this magnitude are measurement glitches
    pub const MAX_PLAUSIBLE_PPM: f64 = 100.0;

    /// Consecutive source failures before the loop escalates to error logs
    pub const MAX_CONSECUTIVE_FAILURES: u32 = 10;
}

/// Environmental compensation presets
pub mod compensation {
    /// Reference temperature of the crystal turnover point, Celsius
    pub const REFERENCE_TEMP_C: f64 = 25.0;

    /// Quadratic thermal coefficient, ppm per C^2
    pub const CRYSTAL_CURVATURE: f64 = 0.0005;

    /// Constant aging offset, ppm
    pub const AGING_PPM: f64 = 0.01;

    /// Linear coefficient for internal RC oscillators, ppm per C
    pub const INTERNAL_RC_LINEAR: f64 = -0.15;

    /// Nominal supply voltage of the simulated board
    pub const NOMINAL_VOLTAGE: f64 = 3.3;

    /// Simulated temperature random-walk step, C
    pub const SIM_TEMP_STEP: f64 = 0.5;

    /// Simulated voltage random-walk step, V
    pub const SIM_VOLTAGE_STEP: f64 = 0.05;
}

/// Beacon synchronization
pub mod sync {
    /// Default interval between syncs, seconds
    pub const BASE_INTERVAL_SECS: f64 = 10.0;

    /// Lower bound on the adapted interval, seconds
    pub const MIN_INTERVAL_SECS: f64 = 1.0;

    /// Upper bound on the adapted interval, seconds
    pub const MAX_INTERVAL_SECS: f64 = 3600.0;

    /// Residuals considered when adapting the interval
    pub const RESIDUAL_WINDOW: usize = 5;

    /// Residual std above which the interval is halved
    pub const UNSTABLE_STD: f64 = 0.1;

    /// Residual std above which the interval stays at base
    pub const SETTLING_STD: f64 = 0.01;

    /// Default beacon broadcast interval, seconds
    pub const BEACON_INTERVAL_SECS: f64 = 10.0;

    /// Retained residual/drift history length
    pub const HISTORY_CAPACITY: usize = 1000;
}

/// Resource limits
pub mod limits {
    /// Maximum settings file size (1 MiB)
    pub const MAX_SETTINGS_FILE_SIZE: u64 = 1024 * 1024;
}
