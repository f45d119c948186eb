//! Host hardware backend (Linux sysfs)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::debug;

use super::{ClockSource, Hal};
use crate::constants::paths;
use crate::error::{DriftError, Result};

pub struct HostHal {
    start: Instant,
    thermal_zone: Option<PathBuf>,
}

impl HostHal {
    pub fn new() -> Self {
        let thermal_zone = find_thermal_zone(Path::new(paths::THERMAL_ZONE_BASE));
        match &thermal_zone {
            Some(p) => debug!("Using thermal zone {}", p.display()),
            None => debug!("No readable thermal zone found"),
        }
        Self {
            start: Instant::now(),
            thermal_zone,
        }
    }

    /// Read temperatures from an explicit `temp` file (millidegrees Celsius)
    pub fn with_thermal_zone(mut self, temp_file: impl Into<PathBuf>) -> Self {
        self.thermal_zone = Some(temp_file.into());
        self
    }
}

impl Default for HostHal {
    fn default() -> Self {
        Self::new()
    }
}

/// First `thermal_zone*/temp` under `base` that parses
fn find_thermal_zone(base: &Path) -> Option<PathBuf> {
    let mut zones: Vec<PathBuf> = fs::read_dir(base)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("thermal_zone"))
        .map(|e| e.path().join("temp"))
        .collect();
    zones.sort();
    zones.into_iter().find(|p| read_millidegrees(p).is_ok())
}

fn read_millidegrees(path: &Path) -> Result<f64> {
    let raw = fs::read_to_string(path).map_err(|e| DriftError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    raw.trim()
        .parse::<f64>()
        .map(|m| m / 1000.0)
        .map_err(|e| DriftError::sensor(format!("{}: {}", path.display(), e)))
}

impl Hal for HostHal {
    fn capture_time(&mut self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn read_temperature(&mut self) -> Result<f64> {
        match &self.thermal_zone {
            Some(path) => read_millidegrees(path),
            None => Err(DriftError::sensor("no thermal zone available")),
        }
    }

    fn read_voltage(&mut self) -> Result<f64> {
        Err(DriftError::NotSupported("supply voltage on host".into()))
    }

    fn clock_source(&self) -> ClockSource {
        ClockSource::External
    }
}
