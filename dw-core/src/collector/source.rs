//! External drift sample sources

use crate::error::Result;

/// Zero-argument provider of a drift value in ppm.
///
/// Any `FnMut() -> Result<f64>` closure is a source.
#[cfg_attr(test, mockall::automock)]
pub trait SampleSource {
    fn sample(&mut self) -> Result<f64>;
}

impl<F> SampleSource for F
where
    F: FnMut() -> Result<f64>,
{
    fn sample(&mut self) -> Result<f64> {
        self()
    }
}
