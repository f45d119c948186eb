//! Persistent settings
//!
//! Stored as JSON in ~/.config/driftwatch/settings.json. Every field has a
//! serde default, so a partial file loads and fills in the rest.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collector::CollectorConfig;
use crate::constants::{limits, paths};
use crate::engine::{Compensation, PredictorConfig};
use crate::error::{DriftError, Result};
use crate::sync::SyncConfig;
use crate::validation::ValidatorConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftSettings {
    #[serde(default)]
    pub predictor: PredictorConfig,
    /// `None` picks a preset from the detected clock source
    #[serde(default)]
    pub compensation: Option<Compensation>,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

fn positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DriftError::invalid_config(field, format!("must be positive, got {}", value)))
    }
}

fn non_zero(field: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(DriftError::invalid_config(field, "must be at least 1"));
    }
    Ok(())
}

impl DriftSettings {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let p = &self.predictor;
        non_zero("predictor.phi_window", p.phi_window)?;
        non_zero("predictor.window_size", p.window_size)?;
        non_zero("predictor.history_capacity", p.history_capacity)?;
        if !(p.process_variance.is_finite() && p.process_variance >= 0.0) {
            return Err(DriftError::invalid_config(
                "predictor.process_variance",
                "must be non-negative",
            ));
        }
        positive("predictor.measurement_variance", p.measurement_variance)?;
        if !(p.autocorr_threshold > 0.0 && p.autocorr_threshold <= 1.0) {
            return Err(DriftError::invalid_config(
                "predictor.autocorr_threshold",
                format!("must be in (0, 1], got {}", p.autocorr_threshold),
            ));
        }

        let c = &self.collector;
        if c.interval_ms == 0 {
            return Err(DriftError::invalid_config("collector.interval_ms", "must be at least 1"));
        }
        non_zero("collector.buffer_capacity", c.buffer_capacity)?;

        positive("validator.max_drift_ppm", self.validator.max_drift_ppm)?;
        non_zero("validator.window_seconds", self.validator.window_seconds)?;

        positive("sync.base_interval_secs", self.sync.base_interval_secs)?;
        positive("sync.beacon_interval_secs", self.sync.beacon_interval_secs)?;
        Ok(())
    }
}

/// `~/.config/driftwatch/settings.json` (or the platform equivalent)
pub fn default_settings_path() -> Result<PathBuf> {
    let dir = paths::user_config_dir()
        .ok_or_else(|| DriftError::config("Could not determine config directory"))?;
    Ok(dir.join(paths::SETTINGS_FILE))
}

/// Load and validate settings. A missing file yields defaults.
pub fn load_settings(path: &Path) -> Result<DriftSettings> {
    if !path.exists() {
        debug!(path = %path.display(), "No settings file, using defaults");
        return Ok(DriftSettings::default());
    }

    let size = fs::metadata(path)
        .map_err(|e| DriftError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?
        .len();
    if size > limits::MAX_SETTINGS_FILE_SIZE {
        return Err(DriftError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max_size: limits::MAX_SETTINGS_FILE_SIZE,
        });
    }

    let content = fs::read_to_string(path).map_err(|e| DriftError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let settings: DriftSettings = serde_json::from_str(&content)?;
    settings.validate()?;
    Ok(settings)
}

/// Write settings atomically (temp file, then rename)
pub fn save_settings(path: &Path, settings: &DriftSettings) -> Result<()> {
    settings.validate()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DriftError::FileWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let json = serde_json::to_string_pretty(settings)?;
    let temp_path = path.with_extension("json.tmp");
    let write_err = |e| DriftError::FileWrite {
        path: temp_path.clone(),
        source: e,
    };

    let mut file = fs::File::create(&temp_path).map_err(write_err)?;
    file.write_all(json.as_bytes()).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| DriftError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
