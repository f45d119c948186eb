//! Adaptive drift predictor
//!
//! Conditions each incoming sample, feeds it to the configured model and
//! keeps the model-selection window current.
//!
//! # Sample Conditioning
//!
//! 1. Values are floored at [`PPM_FLOOR`](crate::constants::predictor::PPM_FLOOR).
//! 2. When the history std exceeds the outlier threshold, the newest value is
//!    pulled to within one ppm of the mean of the preceding samples.
//!
//! Conditioning happens before any model sees the value, so a single spike
//! never reaches the recursive state.
//!
//! # Models
//!
//! - `Ar1`: smoothed regression phi, prediction `phi * last`
//! - `Kalman`: scalar filter, prediction is the posterior state
//! - `Adaptive`: AR(1) state for residuals, predictions from the regime window

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ar1::Ar1Estimator;
use super::kalman::ScalarKalman;
use super::regime::{RegimeTag, SelectionWindow};
use crate::constants::predictor as pred_const;
use crate::data::stats;

/// Which model drives predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Ar1,
    Kalman,
    #[default]
    Adaptive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default)]
    pub model: ModelKind,
    #[serde(default = "default_phi_window")]
    pub phi_window: usize,
    #[serde(default = "default_process_variance")]
    pub process_variance: f64,
    #[serde(default = "default_measurement_variance")]
    pub measurement_variance: f64,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_autocorr_threshold")]
    pub autocorr_threshold: f64,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Apply the ppm floor and outlier pull-in. Off for non-ppm inputs
    /// such as clock offsets in seconds.
    #[serde(default = "default_condition_samples")]
    pub condition_samples: bool,
}

fn default_phi_window() -> usize {
    pred_const::PHI_WINDOW
}

fn default_process_variance() -> f64 {
    pred_const::PROCESS_VARIANCE
}

fn default_measurement_variance() -> f64 {
    pred_const::MEASUREMENT_VARIANCE
}

fn default_window_size() -> usize {
    pred_const::SELECTION_WINDOW
}

fn default_autocorr_threshold() -> f64 {
    pred_const::AUTOCORR_THRESHOLD
}

fn default_history_capacity() -> usize {
    pred_const::HISTORY_CAPACITY
}

fn default_condition_samples() -> bool {
    true
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            phi_window: default_phi_window(),
            process_variance: default_process_variance(),
            measurement_variance: default_measurement_variance(),
            window_size: default_window_size(),
            autocorr_threshold: default_autocorr_threshold(),
            history_capacity: default_history_capacity(),
            condition_samples: default_condition_samples(),
        }
    }
}

impl PredictorConfig {
    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    pub fn with_phi_window(mut self, phi_window: usize) -> Self {
        self.phi_window = phi_window;
        self
    }

    pub fn with_conditioning(mut self, enabled: bool) -> Self {
        self.condition_samples = enabled;
        self
    }
}

/// Recursive state of the selected model
#[derive(Debug, Clone)]
enum ModelState {
    Ar1(Ar1Estimator),
    Kalman(ScalarKalman),
    Adaptive(Ar1Estimator),
}

impl ModelState {
    fn build(config: &PredictorConfig) -> Self {
        match config.model {
            ModelKind::Ar1 => Self::Ar1(Ar1Estimator::new(config.phi_window)),
            ModelKind::Kalman => Self::Kalman(ScalarKalman::new(
                config.process_variance,
                config.measurement_variance,
            )),
            ModelKind::Adaptive => Self::Adaptive(Ar1Estimator::new(config.phi_window)),
        }
    }
}

/// Pull the newest entry of `history` toward the mean of its predecessors
/// when the history is too noisy.
///
/// `history` must already contain the floored value as its last element.
/// Returns the conditioned value.
pub fn condition_newest(history: &mut VecDeque<f64>) -> Option<f64> {
    let last = *history.back()?;
    if history.len() < 2 {
        return Some(last);
    }
    let values: Vec<f64> = history.iter().copied().collect();
    if stats::population_std(&values) <= pred_const::OUTLIER_STD_THRESHOLD {
        return Some(last);
    }
    let prev_mean = stats::mean(&values[..values.len() - 1]);
    let diff = last - prev_mean;
    let pulled = prev_mean + diff.signum() * diff.abs().min(pred_const::OUTLIER_MAX_DEVIATION);
    if !pulled.is_finite() {
        return Some(last);
    }
    if let Some(back) = history.back_mut() {
        *back = pulled;
    }
    Some(pulled)
}

#[derive(Debug, Clone)]
pub struct DriftPredictor {
    config: PredictorConfig,
    history: VecDeque<f64>,
    model: ModelState,
    window: SelectionWindow,
    last_prediction: f64,
}

impl DriftPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        let model = ModelState::build(&config);
        let window = SelectionWindow::new(config.window_size, config.autocorr_threshold);
        Self {
            history: VecDeque::with_capacity(config.history_capacity.min(4096)),
            config,
            model,
            window,
            last_prediction: 0.0,
        }
    }

    pub fn ar1() -> Self {
        Self::new(PredictorConfig::default().with_model(ModelKind::Ar1))
    }

    pub fn kalman() -> Self {
        Self::new(PredictorConfig::default().with_model(ModelKind::Kalman))
    }

    pub fn adaptive() -> Self {
        Self::new(PredictorConfig::default())
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Ingest one raw drift sample (ppm).
    ///
    /// Non-finite samples are dropped without touching state.
    pub fn update(&mut self, sample_ppm: f64, timestamp: Option<f64>) {
        if !sample_ppm.is_finite() {
            warn!(sample = sample_ppm, "Dropping non-finite drift sample");
            return;
        }

        if self.history.len() >= self.config.history_capacity.max(2) {
            self.history.pop_front();
        }
        let value = if self.config.condition_samples {
            self.history.push_back(sample_ppm.max(pred_const::PPM_FLOOR));
            match condition_newest(&mut self.history) {
                Some(v) => v,
                None => return,
            }
        } else {
            self.history.push_back(sample_ppm);
            sample_ppm
        };
        if value != sample_ppm {
            debug!(raw = sample_ppm, conditioned = value, "Conditioned drift sample");
        }

        match &mut self.model {
            ModelState::Ar1(ar) | ModelState::Adaptive(ar) => {
                if let Some(pred) = ar.observe(&self.history) {
                    self.last_prediction = pred;
                }
            }
            ModelState::Kalman(kf) => {
                self.last_prediction = kf.update(value);
            }
        }

        self.window.push(timestamp, value);
    }

    /// Prediction `steps` ahead (minimum one). Pure read of current state.
    pub fn predict(&self, steps: usize, timestamp: Option<f64>) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        match &self.model {
            ModelState::Ar1(ar) => ar.project(self.last_prediction, self.history.len(), steps),
            ModelState::Kalman(kf) => kf.estimate(),
            ModelState::Adaptive(_) => self.window.predict(steps, timestamp),
        }
    }

    /// Last conditioned sample minus the last one-step prediction
    pub fn residual(&self) -> f64 {
        match self.window.latest() {
            Some(last) => last - self.last_prediction,
            None => 0.0,
        }
    }

    /// Update with `sample_ppm`, then return the clock adjustment in seconds
    /// for an interval of `interval_secs`: `-predict() * 1e-6 * interval`.
    pub fn apply_correction(&mut self, sample_ppm: f64, interval_secs: f64) -> f64 {
        self.update(sample_ppm, None);
        -self.predict(1, None) * 1e-6 * interval_secs
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.window.clear();
        self.last_prediction = 0.0;
        match &mut self.model {
            ModelState::Ar1(ar) | ModelState::Adaptive(ar) => ar.reset(),
            ModelState::Kalman(kf) => kf.reset(),
        }
    }

    pub fn last_prediction(&self) -> f64 {
        self.last_prediction
    }

    /// Smoothed AR(1) coefficient; `None` for the Kalman model
    pub fn phi(&self) -> Option<f64> {
        match &self.model {
            ModelState::Ar1(ar) | ModelState::Adaptive(ar) => Some(ar.phi()),
            ModelState::Kalman(_) => None,
        }
    }

    /// Kalman posterior covariance; `None` for AR models
    pub fn covariance(&self) -> Option<f64> {
        match &self.model {
            ModelState::Kalman(kf) => Some(kf.covariance()),
            _ => None,
        }
    }

    pub fn regime(&self) -> Option<RegimeTag> {
        self.window.regime()
    }

    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }

    pub fn sample_count(&self) -> usize {
        self.history.len()
    }
}

impl Default for DriftPredictor {
    fn default() -> Self {
        Self::adaptive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_before_data_is_zero() {
        for p in [DriftPredictor::ar1(), DriftPredictor::kalman(), DriftPredictor::adaptive()] {
            assert_eq!(p.predict(1, None), 0.0);
            assert_eq!(p.residual(), 0.0);
        }
    }

    #[test]
    fn test_floor_applied() {
        let mut p = DriftPredictor::ar1();
        p.update(-500.0, None);
        assert_eq!(p.history()[0], -70.0);
    }

    #[test]
    fn test_floor_never_violated() {
        let mut p = DriftPredictor::kalman();
        for i in 0..200 {
            let v = if i % 3 == 0 { -1e9 } else { (i as f64).sin() * 80.0 };
            p.update(v, Some(i as f64));
            assert!(p.history().iter().all(|h| *h >= -70.0));
        }
    }

    #[test]
    fn test_outlier_pulled_toward_mean() {
        let mut p = DriftPredictor::ar1();
        for _ in 0..5 {
            p.update(0.0, None);
        }
        p.update(50.0, None);
        assert_eq!(*p.history().back().unwrap(), 1.0);
    }

    #[test]
    fn test_unconditioned_keeps_raw_values() {
        let mut p = DriftPredictor::new(PredictorConfig::default().with_conditioning(false));
        p.update(-100.0, Some(0.0));
        assert_eq!(p.history()[0], -100.0);
        for i in 1..5 {
            p.update(0.0, Some(i as f64));
        }
        p.update(50.0, Some(5.0));
        assert_eq!(*p.history().back().unwrap(), 50.0);
        assert_eq!(p.predict(1, Some(5.0)), 50.0);
    }

    #[test]
    fn test_ar1_constant_sequence_converges() {
        let mut p = DriftPredictor::new(PredictorConfig::default().with_model(ModelKind::Ar1).with_phi_window(10));
        for _ in 0..11 {
            p.update(1.0, None);
        }
        assert!((p.last_prediction() - 1.0).abs() <= 1e-3 + 1e-12);
    }

    #[test]
    fn test_phi_always_clamped() {
        let mut p = DriftPredictor::ar1();
        let inputs = [1e-300, 1e300, -1e300, 0.0, 0.0, 1e-320, 5e307, -69.9, 1e308];
        for v in inputs.iter().cycle().take(100) {
            p.update(*v, None);
            let phi = p.phi().unwrap();
            assert!((-0.999..=0.999).contains(&phi), "phi {} out of range", phi);
        }
    }

    #[test]
    fn test_non_finite_sample_dropped() {
        let mut p = DriftPredictor::kalman();
        p.update(2.0, None);
        p.update(f64::NAN, None);
        p.update(f64::INFINITY, None);
        assert_eq!(p.sample_count(), 1);
    }

    #[test]
    fn test_kalman_correction_bounded_by_gain() {
        let mut p = DriftPredictor::kalman();
        p.reset();
        let correction = p.apply_correction(10.0, 2.0);
        assert!(correction.is_finite());
        assert!(correction < 0.0);
        assert!(correction.abs() <= 10.0 * 1e-6 * 2.0);
    }

    #[test]
    fn test_adaptive_selects_regime() {
        let mut p = DriftPredictor::adaptive();
        for i in 0..12 {
            p.update(0.05 * i as f64, Some(i as f64));
        }
        assert_eq!(p.regime(), Some(RegimeTag::Ar1));
        let last = *p.history().back().unwrap();
        let prev = p.history()[p.history().len() - 2];
        assert!((p.predict(2, None) - last * last / prev).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut p = DriftPredictor::adaptive();
        for i in 0..20 {
            p.update(i as f64 * 0.01, Some(i as f64));
        }
        p.reset();
        assert_eq!(p.sample_count(), 0);
        assert_eq!(p.regime(), None);
        assert_eq!(p.last_prediction(), 0.0);
        assert_eq!(p.phi(), Some(0.0));
    }

    #[test]
    fn test_history_bounded() {
        let mut p = DriftPredictor::new(PredictorConfig {
            history_capacity: 16,
            ..PredictorConfig::default()
        });
        for i in 0..100 {
            p.update((i % 5) as f64 * 0.1, None);
        }
        assert_eq!(p.sample_count(), 16);
    }
}
