//! Simulated board: random-walk temperature and supply voltage

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ClockSource, Hal};
use crate::constants::compensation as comp_const;
use crate::error::Result;

pub struct SimulatedHal {
    start: Instant,
    rng: StdRng,
    temperature_c: f64,
    voltage_v: f64,
}

impl SimulatedHal {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Reproducible sensor walk
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            start: Instant::now(),
            rng,
            temperature_c: comp_const::REFERENCE_TEMP_C,
            voltage_v: comp_const::NOMINAL_VOLTAGE,
        }
    }
}

impl Default for SimulatedHal {
    fn default() -> Self {
        Self::new()
    }
}

impl Hal for SimulatedHal {
    fn capture_time(&mut self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn read_temperature(&mut self) -> Result<f64> {
        let step = comp_const::SIM_TEMP_STEP;
        self.temperature_c += self.rng.gen_range(-step..=step);
        Ok(self.temperature_c)
    }

    fn read_voltage(&mut self) -> Result<f64> {
        let step = comp_const::SIM_VOLTAGE_STEP;
        self.voltage_v += self.rng.gen_range(-step..=step);
        Ok(self.voltage_v)
    }

    fn clock_source(&self) -> ClockSource {
        ClockSource::Simulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_walk_step_bounds() {
        let mut hal = SimulatedHal::with_seed(7);
        let mut prev = 25.0;
        for _ in 0..100 {
            let t = hal.read_temperature().unwrap();
            assert!((t - prev).abs() <= 0.5 + 1e-12);
            prev = t;
        }
        let v = hal.read_voltage().unwrap();
        assert!((v - 3.3).abs() <= 0.05 + 1e-12);
    }

    #[test]
    fn test_seed_is_reproducible() {
        let mut a = SimulatedHal::with_seed(42);
        let mut b = SimulatedHal::with_seed(42);
        for _ in 0..10 {
            assert_eq!(a.read_temperature().unwrap(), b.read_temperature().unwrap());
        }
        assert_eq!(a.clock_source(), ClockSource::Simulated);
    }
}
