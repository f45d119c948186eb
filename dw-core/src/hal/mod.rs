//! Hardware capability interface
//!
//! The engine never touches timers or sensors directly. A composition root
//! picks one [`Hal`] implementation and hands it over:
//!
//! - [`HostHal`]: monotonic clock plus kernel thermal zones
//! - [`SimulatedHal`]: random-walk sensors for development boards and tests
//!
//! [`DriftClock`] is the narrower interface the sampling loop uses to
//! measure drift between a monotonic and a reference clock.

mod clock;
mod host;
mod simulated;

pub use clock::{ClockReading, DriftClock, HostDriftClock, SteppedDriftClock};
pub use host::HostHal;
pub use simulated::SimulatedHal;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::EnvironmentSnapshot;
use crate::error::Result;

/// Oscillator family driving the local clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    Simulated,
    /// On-die RC oscillator
    Internal,
    /// External crystal
    External,
}

#[cfg_attr(test, mockall::automock)]
pub trait Hal {
    /// Local clock reading in seconds
    fn capture_time(&mut self) -> f64;

    fn read_temperature(&mut self) -> Result<f64>;

    fn read_voltage(&mut self) -> Result<f64>;

    fn clock_source(&self) -> ClockSource;
}

/// Read every sensor; failed reads are recorded as `None`
pub fn read_environment<H: Hal + ?Sized>(hal: &mut H) -> EnvironmentSnapshot {
    let temperature_c = hal
        .read_temperature()
        .map_err(|e| debug!("Temperature unavailable: {}", e))
        .ok();
    let voltage_v = hal
        .read_voltage()
        .map_err(|e| debug!("Voltage unavailable: {}", e))
        .ok();
    EnvironmentSnapshot {
        temperature_c,
        voltage_v,
    }
}
