//! Fixed-cadence drift collection
//!
//! - `buffer`: ring buffer with wrap-triggered window statistics
//! - `source`: pluggable drift sample sources
//! - `state`: the collector state machine driving one tick at a time

mod buffer;
mod source;
mod state;

pub use buffer::DriftRingBuffer;
pub use source::SampleSource;
pub use state::{
    remaining_interval, Collector, CollectorConfig, CollectorState, TickOutcome, TickReport,
    WindowReport,
};
