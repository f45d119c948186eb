//! Online model selection over a bounded sample window
//!
//! Once enough samples are present, a lag-0 normalized autocorrelation test
//! picks between a ratio-based AR(1) projection and a least-squares line
//! over timestamps.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants::{fingerprint as fp_const, predictor as pred_const};
use crate::data::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeTag {
    Ar1,
    Linear,
}

/// Lag-0 autocorrelation of the centered series, normalized by `var * n`.
///
/// A series with (numerically) zero variance yields 0.0.
pub fn lag0_autocorrelation(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let mean = stats::mean(series);
    let var = stats::population_variance(series);
    let floor = fp_const::ZERO_VARIANCE_RTOL * mean;
    if !(var > floor * floor) || !var.is_finite() {
        return 0.0;
    }
    let n = series.len() as f64;
    let sum_sq: f64 = series.iter().map(|v| (v - mean).powi(2)).sum();
    sum_sq / (var * n)
}

/// Pick a regime for `series`, or `None` while fewer than `min_samples` are present
pub fn choose_regime(series: &[f64], threshold: f64, min_samples: usize) -> Option<RegimeTag> {
    if series.len() < min_samples {
        return None;
    }
    if lag0_autocorrelation(series) > threshold {
        Some(RegimeTag::Ar1)
    } else {
        Some(RegimeTag::Linear)
    }
}

/// Ordinary least squares `drift = slope * t + intercept`.
///
/// Timestamps are centered before fitting. Returns `None` for fewer than two
/// points or a degenerate spread of timestamps.
pub fn fit_line(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let t_mean = points.iter().map(|(t, _)| t).sum::<f64>() / n;
    let d_mean = points.iter().map(|(_, d)| d).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (t, d) in points {
        let dt = t - t_mean;
        sxx += dt * dt;
        sxy += dt * (d - d_mean);
    }
    if sxx.abs() < pred_const::EPSILON || !sxx.is_finite() {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, d_mean - slope * t_mean))
}

/// Capacity-bounded window driving the model-selection overlay
#[derive(Debug, Clone)]
pub struct SelectionWindow {
    capacity: usize,
    threshold: f64,
    drifts: VecDeque<f64>,
    /// Parallel to `drifts`; `None` where the sample arrived without a timestamp
    times: VecDeque<Option<f64>>,
    regime: Option<RegimeTag>,
}

impl SelectionWindow {
    pub fn new(capacity: usize, threshold: f64) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            threshold,
            drifts: VecDeque::with_capacity(capacity),
            times: VecDeque::with_capacity(capacity),
            regime: None,
        }
    }

    pub fn push(&mut self, timestamp: Option<f64>, drift: f64) {
        if self.drifts.len() == self.capacity {
            self.drifts.pop_front();
            self.times.pop_front();
        }
        self.drifts.push_back(drift);
        self.times.push_back(timestamp);

        let series: Vec<f64> = self.drifts.iter().copied().collect();
        if let Some(tag) = choose_regime(&series, self.threshold, pred_const::SELECTION_MIN_SAMPLES) {
            self.regime = Some(tag);
        }
    }

    pub fn regime(&self) -> Option<RegimeTag> {
        self.regime
    }

    pub fn latest(&self) -> Option<f64> {
        self.drifts.back().copied()
    }

    pub fn len(&self) -> usize {
        self.drifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drifts.is_empty()
    }

    /// Regime-dependent prediction; 0.0 on an empty window
    pub fn predict(&self, steps: usize, timestamp: Option<f64>) -> f64 {
        let Some(last) = self.latest() else {
            return 0.0;
        };
        let n = self.drifts.len();

        match (self.regime, timestamp) {
            (Some(RegimeTag::Ar1), _) if n > 1 => {
                let prev = self.drifts[n - 2];
                let phi = if prev != 0.0 { last / prev } else { 1.0 };
                let pred = (1..steps.max(1)).fold(last, |p, _| phi * p);
                if pred.is_finite() {
                    pred
                } else {
                    last
                }
            }
            (Some(RegimeTag::Linear), Some(at)) if n > 1 => {
                let points: Vec<(f64, f64)> = self
                    .times
                    .iter()
                    .zip(self.drifts.iter())
                    .filter_map(|(t, d)| t.map(|t| (t, *d)))
                    .collect();
                match fit_line(&points) {
                    Some((slope, intercept)) => slope * at + intercept,
                    None => last,
                }
            }
            _ => last,
        }
    }

    pub fn clear(&mut self) {
        self.drifts.clear();
        self.times.clear();
        self.regime = None;
    }
}

impl Default for SelectionWindow {
    fn default() -> Self {
        Self::new(pred_const::SELECTION_WINDOW, pred_const::AUTOCORR_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autocorrelation_constant_series() {
        assert_eq!(lag0_autocorrelation(&[0.1; 20]), 0.0);
        assert_eq!(lag0_autocorrelation(&[]), 0.0);
    }

    #[test]
    fn test_autocorrelation_varying_series() {
        let series: Vec<f64> = (0..20).map(|i| (i as f64 * 0.7).sin()).collect();
        assert!((lag0_autocorrelation(&series) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_choose_regime_needs_min_samples() {
        let series: Vec<f64> = (0..9).map(|i| i as f64).collect();
        assert_eq!(choose_regime(&series, 0.9, 10), None);
        let series: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(choose_regime(&series, 0.9, 10), Some(RegimeTag::Ar1));
        assert_eq!(choose_regime(&[2.0; 10], 0.9, 10), Some(RegimeTag::Linear));
    }

    #[test]
    fn test_fit_line_exact() {
        let points: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        let (slope, intercept) = fit_line(&points).unwrap();
        assert!((slope - 2.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);
        assert!(fit_line(&[(1.0, 1.0), (1.0, 2.0)]).is_none());
    }

    #[test]
    fn test_window_unset_returns_latest() {
        let mut w = SelectionWindow::default();
        assert_eq!(w.predict(1, None), 0.0);
        w.push(None, 3.0);
        w.push(None, 4.0);
        assert_eq!(w.regime(), None);
        assert_eq!(w.predict(5, Some(10.0)), 4.0);
    }

    #[test]
    fn test_ar1_ratio_projection() {
        let mut w = SelectionWindow::default();
        for i in 1..=10 {
            w.push(None, i as f64);
        }
        assert_eq!(w.regime(), Some(RegimeTag::Ar1));
        // phi = 10 / 9
        let expected = 10.0 * (10.0f64 / 9.0).powi(2);
        assert!((w.predict(3, None) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_linear_regime_extrapolates() {
        let mut w = SelectionWindow::default();
        for i in 0..10 {
            w.push(Some(i as f64), 5.0);
        }
        assert_eq!(w.regime(), Some(RegimeTag::Linear));
        assert!((w.predict(1, Some(42.0)) - 5.0).abs() < 1e-12);
        // Without a query time the latest sample is returned
        assert_eq!(w.predict(1, None), 5.0);
    }

    #[test]
    fn test_capacity_bound() {
        let mut w = SelectionWindow::new(3, 0.9);
        for i in 0..10 {
            w.push(None, i as f64);
        }
        assert_eq!(w.len(), 3);
        assert_eq!(w.latest(), Some(9.0));
    }
}
