//! Synthetic drift profiles and logical-clock replay
//!
//! Used by tests and offline experiments. Profiles are sample-indexed: sample
//! `i` sits at `i * sampling_interval` seconds.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::predictor as pred_const;
use crate::data::{stats, DriftSample};
use crate::error::{DriftError, Result};

const DEFAULT_SINE_AMPLITUDE: f64 = 5.0;
const DEFAULT_SINE_FREQUENCY: f64 = 0.01;
const DEFAULT_NOISE_STD: f64 = 0.5;
const DEFAULT_SLOPE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileShape {
    /// `amplitude * sin(frequency * t)` on top of the slope
    SlowSine { amplitude: f64, frequency: f64 },
    Ramp,
    /// Constant offset added over `[start, start + duration)`
    Burst { start: usize, duration: usize, magnitude: f64 },
}

impl Default for ProfileShape {
    fn default() -> Self {
        Self::SlowSine {
            amplitude: DEFAULT_SINE_AMPLITUDE,
            frequency: DEFAULT_SINE_FREQUENCY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalSpike {
    pub start: usize,
    pub duration: usize,
    pub magnitude: f64,
}

/// Step change applied from `index` to the end of the profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerEvent {
    pub index: usize,
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftProfileSpec {
    pub length: usize,
    pub sampling_interval: f64,
    pub shape: ProfileShape,
    pub slope: f64,
    pub noise_std: f64,
    pub thermal_spikes: Vec<ThermalSpike>,
    pub power_events: Vec<PowerEvent>,
    /// `None` draws from entropy
    pub seed: Option<u64>,
}

impl DriftProfileSpec {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            sampling_interval: 1.0,
            shape: ProfileShape::default(),
            slope: DEFAULT_SLOPE,
            noise_std: DEFAULT_NOISE_STD,
            thermal_spikes: Vec::new(),
            power_events: Vec::new(),
            seed: None,
        }
    }

    pub fn with_shape(mut self, shape: ProfileShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_slope(mut self, slope: f64) -> Self {
        self.slope = slope;
        self
    }

    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std.max(0.0);
        self
    }

    pub fn with_sampling_interval(mut self, secs: f64) -> Self {
        self.sampling_interval = secs;
        self
    }

    pub fn with_thermal_spike(mut self, start: usize, duration: usize, magnitude: f64) -> Self {
        self.thermal_spikes.push(ThermalSpike {
            start,
            duration,
            magnitude,
        });
        self
    }

    pub fn with_power_event(mut self, index: usize, offset: f64) -> Self {
        self.power_events.push(PowerEvent { index, offset });
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generate the profile in ppm.
    ///
    /// The result is floored at the predictor floor and, when its std exceeds
    /// 1.0, rescaled about its mean to unit std.
    pub fn generate(&self) -> Vec<f64> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut drift: Vec<f64> = (0..self.length)
            .map(|i| {
                let t = i as f64 * self.sampling_interval;
                let base = match self.shape {
                    ProfileShape::SlowSine { amplitude, frequency } => amplitude * (frequency * t).sin(),
                    ProfileShape::Ramp | ProfileShape::Burst { .. } => 0.0,
                };
                base + self.slope * t + self.noise_std * standard_normal(&mut rng)
            })
            .collect();

        if let ProfileShape::Burst {
            start,
            duration,
            magnitude,
        } = self.shape
        {
            add_over(&mut drift, start, duration, magnitude);
        }
        for spike in &self.thermal_spikes {
            add_over(&mut drift, spike.start, spike.duration, spike.magnitude);
        }
        for event in &self.power_events {
            if let Some(tail) = drift.get_mut(event.index..) {
                tail.iter_mut().for_each(|v| *v += event.offset);
            }
        }

        for v in drift.iter_mut() {
            *v = v.max(pred_const::PPM_FLOOR);
        }
        let std = stats::population_std(&drift);
        if std > 1.0 {
            let mean = stats::mean(&drift);
            for v in drift.iter_mut() {
                *v = mean + (*v - mean) / std;
            }
        }
        drift
    }

    /// [`generate`](Self::generate) paired with each sample's time offset
    pub fn generate_samples(&self) -> Vec<DriftSample> {
        self.generate()
            .into_iter()
            .enumerate()
            .map(|(i, ppm)| DriftSample::new(i as f64 * self.sampling_interval, ppm))
            .collect()
    }
}

fn add_over(drift: &mut [f64], start: usize, duration: usize, magnitude: f64) {
    let end = start.saturating_add(duration).min(drift.len());
    if start < end {
        drift[start..end].iter_mut().for_each(|v| *v += magnitude);
    }
}

// Box-Muller
fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1 = rng.gen::<f64>().clamp(f64::MIN_POSITIVE, 1.0);
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplayOptions {
    pub initial_time: f64,
    pub sampling_interval: f64,
    /// Apply the drift with the opposite sign
    pub inverse: bool,
    /// Per-step additive correction, seconds
    pub compensation: Option<Vec<f64>>,
    /// Treat a short compensation profile as zero-padded instead of failing
    pub allow_mismatch: bool,
}

impl ReplayOptions {
    pub fn new(sampling_interval: f64) -> Self {
        Self {
            sampling_interval,
            ..Self::default()
        }
    }
}

/// Integrate a logical clock driven by `profile` (ppm). Returns the clock
/// value after each step.
pub fn apply_drift_to_clock(profile: &[f64], options: &ReplayOptions) -> Result<Vec<f64>> {
    let compensation = options.compensation.as_deref();
    if let Some(comp) = compensation {
        if !options.allow_mismatch && comp.len() != profile.len() {
            return Err(DriftError::ProfileLengthMismatch {
                expected: profile.len(),
                actual: comp.len(),
            });
        }
    }

    let sign = if options.inverse { -1.0 } else { 1.0 };
    let mut clock = options.initial_time;
    let trace = profile
        .iter()
        .enumerate()
        .map(|(i, drift_ppm)| {
            clock += options.sampling_interval * (1.0 + sign * drift_ppm * 1e-6);
            clock += compensation.and_then(|c| c.get(i)).copied().unwrap_or(0.0);
            clock
        })
        .collect();
    Ok(trace)
}
