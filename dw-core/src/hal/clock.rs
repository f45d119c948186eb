//! Drift measurement between a monotonic and a reference clock

use std::time::{Instant, SystemTime};

use crate::constants::collector as coll_const;

/// Elapsed seconds on both clocks since the measurement started
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReading {
    pub monotonic_elapsed: f64,
    pub reference_elapsed: f64,
}

impl ClockReading {
    /// `1e6 * (monotonic - reference) / reference`.
    ///
    /// Zero before the reference clock advances. Readings beyond
    /// `MAX_PLAUSIBLE_PPM` are glitches and also read as zero.
    pub fn drift_ppm(&self) -> f64 {
        if !(self.reference_elapsed > 0.0) {
            return 0.0;
        }
        let ppm = 1e6 * (self.monotonic_elapsed - self.reference_elapsed) / self.reference_elapsed;
        if !ppm.is_finite() || ppm.abs() > coll_const::MAX_PLAUSIBLE_PPM {
            return 0.0;
        }
        ppm
    }
}

pub trait DriftClock {
    fn read(&mut self) -> ClockReading;
}

/// Host clocks: `Instant` against wall-clock `SystemTime`
#[derive(Debug)]
pub struct HostDriftClock {
    monotonic_start: Instant,
    reference_start: SystemTime,
}

impl HostDriftClock {
    pub fn new() -> Self {
        Self {
            monotonic_start: Instant::now(),
            reference_start: SystemTime::now(),
        }
    }
}

impl Default for HostDriftClock {
    fn default() -> Self {
        Self::new()
    }
}

impl DriftClock for HostDriftClock {
    fn read(&mut self) -> ClockReading {
        let monotonic_elapsed = self.monotonic_start.elapsed().as_secs_f64();
        // A wall clock stepped backwards reads as no elapsed time
        let reference_elapsed = SystemTime::now()
            .duration_since(self.reference_start)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        ClockReading {
            monotonic_elapsed,
            reference_elapsed,
        }
    }
}

/// Deterministic clock advancing by a fixed step per read with a constant rate error
#[derive(Debug, Clone)]
pub struct SteppedDriftClock {
    step_secs: f64,
    drift_ppm: f64,
    reads: u64,
}

impl SteppedDriftClock {
    pub fn new(step_secs: f64, drift_ppm: f64) -> Self {
        Self {
            step_secs,
            drift_ppm,
            reads: 0,
        }
    }
}

impl DriftClock for SteppedDriftClock {
    fn read(&mut self) -> ClockReading {
        self.reads += 1;
        let reference_elapsed = self.reads as f64 * self.step_secs;
        ClockReading {
            monotonic_elapsed: reference_elapsed * (1.0 + self.drift_ppm * 1e-6),
            reference_elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_ppm() {
        let r = ClockReading {
            monotonic_elapsed: 10.0001,
            reference_elapsed: 10.0,
        };
        assert!((r.drift_ppm() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_reference_reads_zero() {
        let r = ClockReading {
            monotonic_elapsed: 0.5,
            reference_elapsed: 0.0,
        };
        assert_eq!(r.drift_ppm(), 0.0);
    }

    #[test]
    fn test_glitch_reads_zero() {
        let r = ClockReading {
            monotonic_elapsed: 1.01,
            reference_elapsed: 1.0,
        };
        assert_eq!(r.drift_ppm(), 0.0);
    }

    #[test]
    fn test_stepped_clock_reports_configured_drift() {
        let mut clock = SteppedDriftClock::new(0.1, 25.0);
        clock.read();
        let reading = clock.read();
        assert!((reading.reference_elapsed - 0.2).abs() < 1e-12);
        assert!((reading.drift_ppm() - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_host_clock_is_plausible() {
        let mut clock = HostDriftClock::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let reading = clock.read();
        assert!(reading.monotonic_elapsed > 0.0);
        assert!(reading.drift_ppm().abs() <= 100.0);
    }
}
