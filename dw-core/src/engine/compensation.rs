//! Environmental compensation applied before the predictor
//!
//! A compensation is a plain value carrying its coefficients; the
//! composition root picks one per deployment with
//! [`Compensation::for_clock_source`].

use serde::{Deserialize, Serialize};

use super::predictor::DriftPredictor;
use super::DriftEstimator;
use crate::constants::compensation as comp_const;
use crate::data::EnvironmentSnapshot;
use crate::hal::{read_environment, ClockSource, Hal};

/// Thermal and aging terms for one oscillator type.
///
/// `thermal = curvature * (T - reference)^2 + linear * T`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalModel {
    pub curvature: f64,
    pub reference_c: f64,
    pub linear: f64,
    pub aging_ppm: f64,
}

impl ThermalModel {
    /// Quartz crystal with a parabolic turnover at 25 C
    pub fn crystal() -> Self {
        Self {
            curvature: comp_const::CRYSTAL_CURVATURE,
            reference_c: comp_const::REFERENCE_TEMP_C,
            linear: 0.0,
            aging_ppm: comp_const::AGING_PPM,
        }
    }

    /// On-die RC oscillator, roughly linear in temperature
    pub fn internal_rc() -> Self {
        Self {
            curvature: 0.0,
            reference_c: comp_const::REFERENCE_TEMP_C,
            linear: comp_const::INTERNAL_RC_LINEAR,
            aging_ppm: 0.0,
        }
    }

    pub fn thermal_term(&self, temperature_c: f64) -> f64 {
        self.curvature * (temperature_c - self.reference_c).powi(2) + self.linear * temperature_c
    }
}

/// Breakdown of one compensated sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompensatedDrift {
    pub raw: f64,
    pub thermal: f64,
    pub aging: f64,
    pub adjusted: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Compensation {
    #[default]
    Passthrough,
    /// Simulated boards carry no environmental error model
    Simulated,
    Thermal(ThermalModel),
}

impl Compensation {
    pub fn for_clock_source(source: ClockSource) -> Self {
        match source {
            ClockSource::Simulated => Self::Simulated,
            ClockSource::External => Self::Thermal(ThermalModel::crystal()),
            ClockSource::Internal => Self::Thermal(ThermalModel::internal_rc()),
        }
    }

    /// Subtract the environment-derived terms from `raw`.
    /// A missing temperature is taken as the model's reference temperature.
    pub fn compensate(&self, raw: f64, env: &EnvironmentSnapshot) -> CompensatedDrift {
        match self {
            Self::Passthrough | Self::Simulated => CompensatedDrift {
                raw,
                thermal: 0.0,
                aging: 0.0,
                adjusted: raw,
            },
            Self::Thermal(model) => {
                let temp = env.temperature_c.unwrap_or(model.reference_c);
                let thermal = model.thermal_term(temp);
                CompensatedDrift {
                    raw,
                    thermal,
                    aging: model.aging_ppm,
                    adjusted: raw - thermal - model.aging_ppm,
                }
            }
        }
    }
}

/// Last compensation breakdown plus the predictor's one-step output
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DriftComponents {
    pub raw: Option<f64>,
    pub thermal: Option<f64>,
    pub aging: Option<f64>,
    pub compensated: f64,
}

/// Predictor decorator that compensates each sample using live sensor data
pub struct EnvironmentAwarePredictor<H: Hal> {
    hal: H,
    compensation: Compensation,
    inner: DriftPredictor,
    last: Option<CompensatedDrift>,
}

impl<H: Hal> EnvironmentAwarePredictor<H> {
    /// Compensation follows the HAL's clock source
    pub fn new(hal: H, inner: DriftPredictor) -> Self {
        let compensation = Compensation::for_clock_source(hal.clock_source());
        Self::with_compensation(hal, inner, compensation)
    }

    pub fn with_compensation(hal: H, inner: DriftPredictor, compensation: Compensation) -> Self {
        Self {
            hal,
            compensation,
            inner,
            last: None,
        }
    }

    pub fn compensation(&self) -> Compensation {
        self.compensation
    }

    pub fn inner(&self) -> &DriftPredictor {
        &self.inner
    }

    /// Compensate `raw_ppm` and feed it to the wrapped predictor.
    /// Without an explicit timestamp the HAL clock stamps the sample.
    pub fn update(&mut self, raw_ppm: f64, timestamp: Option<f64>) {
        let ts = timestamp.unwrap_or_else(|| self.hal.capture_time());
        let env = read_environment(&mut self.hal);
        let comp = self.compensation.compensate(raw_ppm, &env);
        self.last = Some(comp);
        self.inner.update(comp.adjusted, Some(ts));
    }

    pub fn drift_components(&self) -> DriftComponents {
        let thermal_terms = matches!(self.compensation, Compensation::Thermal(_));
        DriftComponents {
            raw: self.last.map(|c| c.raw),
            thermal: self.last.filter(|_| thermal_terms).map(|c| c.thermal),
            aging: self.last.filter(|_| thermal_terms).map(|c| c.aging),
            compensated: self.inner.last_prediction(),
        }
    }
}

impl<H: Hal> DriftEstimator for EnvironmentAwarePredictor<H> {
    fn update(&mut self, sample_ppm: f64, timestamp: Option<f64>) {
        EnvironmentAwarePredictor::update(self, sample_ppm, timestamp);
    }

    fn predict(&self, steps: usize, timestamp: Option<f64>) -> f64 {
        self.inner.predict(steps, timestamp)
    }

    fn residual(&self) -> f64 {
        self.inner.residual()
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockHal;

    #[test]
    fn test_crystal_compensation() {
        let comp = Compensation::Thermal(ThermalModel::crystal());
        let out = comp.compensate(5.0, &EnvironmentSnapshot::with_temperature(35.0));
        assert!((out.thermal - 0.05).abs() < 1e-12);
        assert!((out.adjusted - (5.0 - 0.05 - 0.01)).abs() < 1e-12);
    }

    #[test]
    fn test_missing_temperature_uses_reference() {
        let comp = Compensation::Thermal(ThermalModel::crystal());
        let out = comp.compensate(1.0, &EnvironmentSnapshot::default());
        assert_eq!(out.thermal, 0.0);
        assert!((out.adjusted - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_passthrough_variants() {
        for comp in [Compensation::Passthrough, Compensation::Simulated] {
            let out = comp.compensate(-3.0, &EnvironmentSnapshot::with_temperature(80.0));
            assert_eq!(out.adjusted, -3.0);
        }
    }

    #[test]
    fn test_internal_rc_linear_term() {
        let model = ThermalModel::internal_rc();
        assert!((model.thermal_term(20.0) + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_decorator_feeds_adjusted_value() {
        let mut hal = MockHal::new();
        hal.expect_clock_source().return_const(ClockSource::External);
        hal.expect_capture_time().returning(|| 1.0);
        hal.expect_read_temperature().returning(|| Ok(45.0));
        hal.expect_read_voltage().returning(|| Ok(3.3));

        let mut p = EnvironmentAwarePredictor::new(hal, DriftPredictor::kalman());
        p.update(2.0, None);

        let expected = 2.0 - 0.0005 * 400.0 - 0.01;
        assert!((p.inner().history()[0] - expected).abs() < 1e-12);

        let parts = p.drift_components();
        assert_eq!(parts.raw, Some(2.0));
        assert!((parts.thermal.unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(parts.aging, Some(0.01));
        assert_eq!(parts.compensated, p.inner().last_prediction());
    }
}
