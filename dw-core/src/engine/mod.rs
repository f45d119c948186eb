//! Drift estimation engine
//!
//! Predictor models, online model selection and environmental compensation.

mod ar1;
mod compensation;
mod kalman;
mod predictor;
mod regime;

pub use ar1::{regression_phi, Ar1Estimator};
pub use compensation::{
    CompensatedDrift, Compensation, DriftComponents, EnvironmentAwarePredictor, ThermalModel,
};
pub use kalman::ScalarKalman;
pub use predictor::{condition_newest, DriftPredictor, ModelKind, PredictorConfig};
pub use regime::{choose_regime, fit_line, lag0_autocorrelation, RegimeTag, SelectionWindow};

/// Uniform update/predict surface consumed by the sampling loop
pub trait DriftEstimator {
    fn update(&mut self, sample_ppm: f64, timestamp: Option<f64>);

    fn predict(&self, steps: usize, timestamp: Option<f64>) -> f64;

    fn residual(&self) -> f64;

    fn reset(&mut self);
}

impl DriftEstimator for DriftPredictor {
    fn update(&mut self, sample_ppm: f64, timestamp: Option<f64>) {
        DriftPredictor::update(self, sample_ppm, timestamp);
    }

    fn predict(&self, steps: usize, timestamp: Option<f64>) -> f64 {
        DriftPredictor::predict(self, steps, timestamp)
    }

    fn residual(&self) -> f64 {
        DriftPredictor::residual(self)
    }

    fn reset(&mut self) {
        DriftPredictor::reset(self);
    }
}
