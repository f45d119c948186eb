//! Beacon-driven synchronization
//!
//! Only the predictor-facing half of the beacon protocol lives here;
//! delivering beacons between nodes is the caller's concern. All times are
//! seconds on the caller's clock, passed in explicitly.

use std::collections::VecDeque;

use dw_protocol::{Beacon, SyncParameters};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::sync as sync_const;
use crate::data::stats;
use crate::engine::{DriftPredictor, PredictorConfig};
use crate::error::{DriftError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_base_interval")]
    pub base_interval_secs: f64,
    #[serde(default = "default_beacon_interval")]
    pub beacon_interval_secs: f64,
}

fn default_base_interval() -> f64 {
    sync_const::BASE_INTERVAL_SECS
}

fn default_beacon_interval() -> f64 {
    sync_const::BEACON_INTERVAL_SECS
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: default_base_interval(),
            beacon_interval_secs: default_beacon_interval(),
        }
    }
}

fn push_bounded(history: &mut VecDeque<f64>, value: f64) {
    if history.len() >= sync_const::HISTORY_CAPACITY {
        history.pop_front();
    }
    history.push_back(value);
}

/// Tracks offset against a reference and adapts how often to resync
#[derive(Debug, Clone)]
pub struct TimeSynchronizer {
    node_id: String,
    predictor: DriftPredictor,
    base_interval: f64,
    sync_interval: f64,
    stability_factor: f64,
    last_sync: Option<f64>,
    drift_history: VecDeque<f64>,
    residual_history: VecDeque<f64>,
}

impl TimeSynchronizer {
    pub fn new(node_id: impl Into<String>, base_interval_secs: f64) -> Self {
        let predictor = DriftPredictor::new(PredictorConfig::default().with_conditioning(false));
        Self::with_predictor(node_id, base_interval_secs, predictor)
    }

    /// Offsets are in seconds, so `predictor` should be built with
    /// sample conditioning disabled.
    pub fn with_predictor(node_id: impl Into<String>, base_interval_secs: f64, predictor: DriftPredictor) -> Self {
        Self {
            node_id: node_id.into(),
            predictor,
            base_interval: base_interval_secs,
            sync_interval: base_interval_secs,
            stability_factor: 1.0,
            last_sync: None,
            drift_history: VecDeque::new(),
            residual_history: VecDeque::new(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn predictor(&self) -> &DriftPredictor {
        &self.predictor
    }

    /// Feed `local - reference` into the predictor. Returns the residual.
    pub fn synchronize(&mut self, reference_time: f64, local_time: f64) -> f64 {
        let offset = local_time - reference_time;
        self.predictor.update(offset, Some(local_time));
        let residual = self.predictor.residual();

        push_bounded(&mut self.residual_history, residual);
        push_bounded(&mut self.drift_history, offset);
        self.adapt_interval();
        self.last_sync = Some(local_time);

        debug!(node = %self.node_id, offset, residual, interval = self.sync_interval, "Synchronized");
        residual
    }

    fn adapt_interval(&mut self) {
        let n = self.residual_history.len();
        if n < sync_const::RESIDUAL_WINDOW {
            return;
        }
        let recent: Vec<f64> = self
            .residual_history
            .iter()
            .skip(n - sync_const::RESIDUAL_WINDOW)
            .copied()
            .collect();
        let residual_std = stats::population_std(&recent);

        self.sync_interval = if residual_std > sync_const::UNSTABLE_STD {
            (self.base_interval * 0.5).max(sync_const::MIN_INTERVAL_SECS)
        } else if residual_std > sync_const::SETTLING_STD {
            self.base_interval
        } else {
            (self.base_interval * 2.0).min(sync_const::MAX_INTERVAL_SECS)
        };
        self.stability_factor = residual_std;
    }

    /// Local time minus the predicted offset
    pub fn corrected_time(&self, local_time: f64) -> f64 {
        local_time - self.predictor.predict(1, Some(local_time))
    }

    pub fn should_sync(&self, now: f64) -> bool {
        match self.last_sync {
            Some(last) => now - last >= self.sync_interval,
            None => true,
        }
    }

    pub fn sync_interval(&self) -> f64 {
        self.sync_interval
    }

    pub fn sync_parameters(&self) -> SyncParameters {
        SyncParameters {
            sync_interval: self.sync_interval,
            stability_factor: self.stability_factor,
            last_drift: self.drift_history.back().copied(),
            residual: self.residual_history.back().copied(),
        }
    }
}

/// Beacon exchange on top of a [`TimeSynchronizer`]
#[derive(Debug, Clone)]
pub struct BeaconSync {
    synchronizer: TimeSynchronizer,
    beacon_interval: f64,
    last_beacon: Option<f64>,
}

impl BeaconSync {
    pub fn new(node_id: impl Into<String>, config: &SyncConfig) -> Self {
        Self {
            synchronizer: TimeSynchronizer::new(node_id, config.base_interval_secs),
            beacon_interval: config.beacon_interval_secs,
            last_beacon: None,
        }
    }

    pub fn synchronizer(&self) -> &TimeSynchronizer {
        &self.synchronizer
    }

    /// Treat the beacon's time as the reference for `local_time`
    pub fn receive_beacon(&mut self, beacon: &Beacon, local_time: f64) -> Result<f64> {
        beacon.validate().map_err(DriftError::generic)?;
        let residual = self.synchronizer.synchronize(beacon.beacon_time, local_time);
        info!(
            node = %self.synchronizer.node_id(),
            from = %beacon.node_id,
            reference = beacon.beacon_time,
            residual,
            next_sync_secs = self.synchronizer.sync_interval(),
            "SYNC: beacon applied"
        );
        Ok(residual)
    }

    pub fn adjusted_time(&self, local_time: f64) -> f64 {
        self.synchronizer.corrected_time(local_time)
    }

    pub fn should_send_beacon(&self, now: f64) -> bool {
        match self.last_beacon {
            Some(last) => now - last >= self.beacon_interval,
            None => true,
        }
    }

    pub fn send_beacon(&mut self, local_time: f64) -> Beacon {
        self.last_beacon = Some(local_time);
        Beacon {
            node_id: self.synchronizer.node_id().to_string(),
            beacon_time: self.adjusted_time(local_time),
            sync_params: self.synchronizer.sync_parameters(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_residuals_double_interval() {
        let mut sync = TimeSynchronizer::new("a", 10.0);
        for i in 0..6 {
            let t = i as f64 * 10.0;
            sync.synchronize(t, t);
        }
        assert_eq!(sync.sync_interval(), 20.0);
        assert_eq!(sync.sync_parameters().stability_factor, 0.0);
    }

    #[test]
    fn test_noisy_residuals_halve_interval() {
        let mut sync = TimeSynchronizer::new("a", 10.0);
        let offsets = [0.0, 5.0, -5.0, 8.0, -8.0, 6.0, -6.0];
        for (i, off) in offsets.iter().enumerate() {
            let t = 100.0 + i as f64;
            sync.synchronize(t - off, t);
        }
        assert_eq!(sync.sync_interval(), 5.0);
        assert!(sync.sync_parameters().stability_factor > 0.1);
    }

    #[test]
    fn test_interval_bounds() {
        let mut sync = TimeSynchronizer::new("a", 3000.0);
        for i in 0..6 {
            sync.synchronize(i as f64, i as f64);
        }
        assert_eq!(sync.sync_interval(), 3600.0);

        let mut sync = TimeSynchronizer::new("b", 1.0);
        for (i, off) in [0.0, 9.0, -9.0, 9.0, -9.0, 9.0].iter().enumerate() {
            sync.synchronize(i as f64 - off, i as f64);
        }
        assert_eq!(sync.sync_interval(), 1.0);
    }

    #[test]
    fn test_large_negative_offset_corrected() {
        let mut sync = TimeSynchronizer::new("a", 10.0);
        sync.synchronize(1100.0, 1000.0);
        assert_eq!(sync.corrected_time(1000.0), 1100.0);
        assert_eq!(sync.sync_parameters().last_drift, Some(-100.0));
    }

    #[test]
    fn test_offset_step_tracked() {
        let mut sync = TimeSynchronizer::new("a", 10.0);
        for i in 0..5 {
            let t = i as f64;
            sync.synchronize(t, t);
        }
        sync.synchronize(10.0, 15.0);
        assert_eq!(sync.sync_parameters().last_drift, Some(5.0));
        assert_eq!(sync.corrected_time(15.0), 10.0);
    }

    #[test]
    fn test_should_sync() {
        let mut sync = TimeSynchronizer::new("a", 10.0);
        assert!(sync.should_sync(0.0));
        sync.synchronize(5.0, 5.0);
        assert!(!sync.should_sync(14.9));
        assert!(sync.should_sync(15.0));
    }

    #[test]
    fn test_beacon_exchange() {
        let config = SyncConfig::default();
        let mut leader = BeaconSync::new("leader", &config);
        let mut follower = BeaconSync::new("follower", &config);

        assert!(leader.should_send_beacon(0.0));
        let beacon = leader.send_beacon(0.0);
        assert!(!leader.should_send_beacon(5.0));
        assert_eq!(beacon.node_id, "leader");

        let residual = follower.receive_beacon(&beacon, 0.25).unwrap();
        assert!(residual.is_finite());
        let params = follower.synchronizer().sync_parameters();
        assert_eq!(params.last_drift, Some(0.25));
    }

    #[test]
    fn test_invalid_beacon_rejected() {
        let mut follower = BeaconSync::new("follower", &SyncConfig::default());
        let mut beacon = BeaconSync::new("x", &SyncConfig::default()).send_beacon(1.0);
        beacon.beacon_time = f64::NAN;
        assert!(follower.receive_beacon(&beacon, 1.0).is_err());
    }
}
