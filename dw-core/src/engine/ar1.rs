//! First-order autoregressive drift estimator
//!
//! phi is re-estimated on every update by least squares over a trailing
//! lag-1 window, clamped to [-PHI_LIMIT, PHI_LIMIT] and smoothed with an
//! exponential moving average.

use std::collections::VecDeque;

use crate::constants::predictor as pred_const;

/// Least-squares lag-1 coefficient over the trailing `window` pairs of `history`.
///
/// Returns 0.0 when the denominator is zero or not finite, or when the
/// history is too short to form a pair.
pub fn regression_phi(history: &VecDeque<f64>, window: usize) -> f64 {
    let len = history.len();
    if len < 2 || window == 0 {
        return 0.0;
    }
    let window = window.min(len - 1);
    let start = len - window;

    let mut num = 0.0;
    let mut denom = 0.0;
    for i in start..len {
        let prev = history[i - 1];
        num += prev * history[i];
        denom += prev * prev;
    }

    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    let phi = num / denom;
    if phi.is_nan() {
        return 0.0;
    }
    phi.clamp(-pred_const::PHI_LIMIT, pred_const::PHI_LIMIT)
}

#[derive(Debug, Clone)]
pub struct Ar1Estimator {
    phi_window: usize,
    smoothing: f64,
    /// `None` until the first regression estimate; that estimate seeds the EMA
    phi: Option<f64>,
}

impl Ar1Estimator {
    pub fn new(phi_window: usize) -> Self {
        Self {
            phi_window: phi_window.max(1),
            smoothing: pred_const::PHI_SMOOTHING,
            phi: None,
        }
    }

    /// Smoothed coefficient, 0.0 before the first estimate
    pub fn phi(&self) -> f64 {
        self.phi.unwrap_or(0.0)
    }

    /// Ingest the (already conditioned) history after a new sample was appended.
    ///
    /// Returns the new one-step prediction, or `None` when the history is
    /// still too short to say anything.
    pub fn observe(&mut self, history: &VecDeque<f64>) -> Option<f64> {
        let last = *history.back()?;
        match history.len() {
            0 | 1 => None,
            2 => Some(last),
            _ => {
                let raw = regression_phi(history, self.phi_window);
                let smoothed = match self.phi {
                    Some(prev) => self.smoothing * raw + (1.0 - self.smoothing) * prev,
                    None => raw,
                };
                let smoothed = smoothed.clamp(-pred_const::PHI_LIMIT, pred_const::PHI_LIMIT);
                self.phi = Some(smoothed);
                Some(smoothed * last)
            }
        }
    }

    /// Multi-step projection starting from the one-step prediction
    pub fn project(&self, one_step: f64, history_len: usize, steps: usize) -> f64 {
        if history_len <= 2 {
            return one_step;
        }
        let phi = self.phi();
        (1..steps.max(1)).fold(one_step, |pred, _| phi * pred)
    }

    pub fn reset(&mut self) {
        self.phi = None;
    }
}

impl Default for Ar1Estimator {
    fn default() -> Self {
        Self::new(pred_const::PHI_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(values: &[f64]) -> VecDeque<f64> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_regression_phi_clamped() {
        let h = history(&[1e-300, 1e300, 1e300]);
        let phi = regression_phi(&h, 10);
        assert!((-0.999..=0.999).contains(&phi));
    }

    #[test]
    fn test_regression_phi_zero_denominator() {
        assert_eq!(regression_phi(&history(&[0.0, 0.0, 5.0]), 10), 0.0);
    }

    #[test]
    fn test_persistence_with_two_samples() {
        let mut ar = Ar1Estimator::default();
        assert_eq!(ar.observe(&history(&[3.0])), None);
        assert_eq!(ar.observe(&history(&[3.0, 4.0])), Some(4.0));
        assert_eq!(ar.phi(), 0.0);
    }

    #[test]
    fn test_first_estimate_seeds_phi() {
        let mut ar = Ar1Estimator::default();
        ar.observe(&history(&[2.0, 2.0, 2.0]));
        assert!((ar.phi() - 0.999).abs() < 1e-12);
    }

    #[test]
    fn test_ema_smoothing() {
        let mut ar = Ar1Estimator::default();
        ar.observe(&history(&[1.0, 1.0, 1.0]));
        ar.observe(&history(&[1.0, 1.0, 1.0, -1.0]));
        let expected = 0.5 * (1.0 / 3.0) + 0.5 * 0.999;
        let raw = regression_phi(&history(&[1.0, 1.0, 1.0, -1.0]), 10);
        assert!((raw - 1.0 / 3.0).abs() < 1e-12);
        assert!((ar.phi() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_projection_iterates_phi() {
        let mut ar = Ar1Estimator::default();
        let one = ar.observe(&history(&[4.0, 2.0, 1.0])).unwrap();
        let phi = ar.phi();
        assert!((ar.project(one, 3, 3) - one * phi * phi).abs() < 1e-12);
        assert_eq!(ar.project(5.0, 2, 4), 5.0);
    }
}
