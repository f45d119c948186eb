//! Scalar Kalman filter with identity transition and observation

use crate::constants::predictor as pred_const;

#[derive(Debug, Clone)]
pub struct ScalarKalman {
    state: f64,
    covariance: f64,
    process_variance: f64,
    measurement_variance: f64,
}

impl ScalarKalman {
    /// Negative variances are clamped to zero
    pub fn new(process_variance: f64, measurement_variance: f64) -> Self {
        Self {
            state: 0.0,
            covariance: pred_const::INITIAL_COVARIANCE,
            process_variance: process_variance.max(0.0),
            measurement_variance: measurement_variance.max(0.0),
        }
    }

    /// One predict/update cycle. Returns the posterior state.
    pub fn update(&mut self, measurement: f64) -> f64 {
        // Predict: A = 1, so only the covariance moves
        let prior_cov = self.covariance + self.process_variance;

        let innovation = measurement - self.state;
        let s = prior_cov + self.measurement_variance;
        if !(s > 0.0 && s.is_finite()) {
            self.covariance = prior_cov.max(0.0);
            return self.state;
        }

        let gain = prior_cov / s;
        self.state += gain * innovation;
        self.covariance = ((1.0 - gain) * prior_cov).max(0.0);
        self.state
    }

    pub fn estimate(&self) -> f64 {
        self.state
    }

    pub fn covariance(&self) -> f64 {
        self.covariance
    }

    /// Gain the next update would apply
    pub fn next_gain(&self) -> f64 {
        let prior = self.covariance + self.process_variance;
        let s = prior + self.measurement_variance;
        if s > 0.0 && s.is_finite() {
            prior / s
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
        self.covariance = pred_const::INITIAL_COVARIANCE;
    }
}

impl Default for ScalarKalman {
    fn default() -> Self {
        Self::new(pred_const::PROCESS_VARIANCE, pred_const::MEASUREMENT_VARIANCE)
    }
}
