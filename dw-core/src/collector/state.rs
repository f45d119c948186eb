//! Sampling loop state machine
//!
//! ```text
//! Idle -> WarmingUp (discard N) -> Running -> Stopped
//! ```
//!
//! The collector owns the predictor, the ring buffer and the log sink. It
//! performs exactly one tick per call; cadence and cancellation belong to
//! whichever loop drives it.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::buffer::DriftRingBuffer;
use super::source::SampleSource;
use crate::constants::collector as coll_const;
use crate::data::{DriftLog, LogRecord, WindowStats};
use crate::engine::{DriftEstimator, DriftPredictor};
use crate::hal::DriftClock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_warmup_samples")]
    pub warmup_samples: usize,
}

fn default_interval_ms() -> u64 {
    coll_const::SAMPLE_INTERVAL.as_millis() as u64
}

fn default_buffer_capacity() -> usize {
    coll_const::BUFFER_CAPACITY
}

fn default_warmup_samples() -> usize {
    coll_const::WARMUP_SAMPLES
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            buffer_capacity: default_buffer_capacity(),
            warmup_samples: default_warmup_samples(),
        }
    }
}

impl CollectorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    WarmingUp { discarded: usize },
    Running,
    Stopped,
}

/// Statistics reported when the ring buffer wraps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReport {
    pub stats: WindowStats,
    pub latest_prediction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub record: LogRecord,
    /// The override source failed and the measured drift was used
    pub source_fallback: bool,
    pub window: Option<WindowReport>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Discarded,
    Recorded(TickReport),
    Stopped,
}

/// Time left in the tick after `elapsed`, never negative
pub fn remaining_interval(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

pub struct Collector<P: DriftEstimator = DriftPredictor> {
    config: CollectorConfig,
    state: CollectorState,
    clock: Box<dyn DriftClock + Send>,
    source: Option<Box<dyn SampleSource + Send>>,
    log: Box<dyn DriftLog + Send>,
    predictor: P,
    buffer: DriftRingBuffer,
    recorded: u64,
    source_failures: u32,
    log_failures: u64,
}

impl<P: DriftEstimator> Collector<P> {
    pub fn new(
        config: CollectorConfig,
        clock: Box<dyn DriftClock + Send>,
        log: Box<dyn DriftLog + Send>,
        predictor: P,
    ) -> Self {
        let buffer = DriftRingBuffer::new(config.buffer_capacity);
        Self {
            config,
            state: CollectorState::Idle,
            clock,
            source: None,
            log,
            predictor,
            buffer,
            recorded: 0,
            source_failures: 0,
            log_failures: 0,
        }
    }

    /// Take drift values from `source` instead of the clock measurement
    pub fn with_source(mut self, source: Box<dyn SampleSource + Send>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn buffer(&self) -> &DriftRingBuffer {
        &self.buffer
    }

    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    pub fn log_failures(&self) -> u64 {
        self.log_failures
    }

    pub fn start(&mut self) {
        if self.state != CollectorState::Idle {
            return;
        }
        info!(
            interval_ms = self.config.interval_ms,
            warmup = self.config.warmup_samples,
            capacity = self.buffer.capacity(),
            "Starting drift collector"
        );
        self.state = if self.config.warmup_samples == 0 {
            CollectorState::Running
        } else {
            CollectorState::WarmingUp { discarded: 0 }
        };
    }

    pub fn stop(&mut self) {
        if self.state != CollectorState::Stopped {
            info!(recorded = self.recorded, "Drift collector stopped");
        }
        self.state = CollectorState::Stopped;
    }

    /// Run one tick. An idle collector starts itself first.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state == CollectorState::Idle {
            self.start();
        }

        let reading = match self.state {
            CollectorState::Stopped => return TickOutcome::Stopped,
            _ => self.clock.read(),
        };
        let measured = reading.drift_ppm();

        if let CollectorState::WarmingUp { discarded } = self.state {
            let discarded = discarded + 1;
            debug!(discarded, measured, "Warm-up sample discarded");
            self.state = if discarded >= self.config.warmup_samples {
                CollectorState::Running
            } else {
                CollectorState::WarmingUp { discarded }
            };
            return TickOutcome::Discarded;
        }

        let (drift, source_fallback) = self.acquire(measured);
        let timestamp = reading.monotonic_elapsed;

        self.predictor.update(drift, Some(timestamp));
        let predicted = self.predictor.predict(1, Some(timestamp));

        let record = LogRecord {
            timestamp: Utc::now(),
            monotonic_elapsed: reading.monotonic_elapsed,
            reference_elapsed: reading.reference_elapsed,
            drift_ppm: drift,
            predicted_drift_ppm: predicted,
        };
        if let Err(e) = self.log.append(&record) {
            self.log_failures += 1;
            warn!("Failed to persist drift sample: {}", e);
        }

        let window = self.buffer.write(drift).map(|stats| {
            let report = WindowReport {
                stats,
                latest_prediction: predicted,
            };
            info!(
                "Drift Stats: mean={:.2}ppm std={:.2} range=[{:.2}, {:.2}] prediction={:.3}",
                stats.mean, stats.std, stats.min, stats.max, predicted
            );
            report
        });

        self.recorded += 1;
        TickOutcome::Recorded(TickReport {
            record,
            source_fallback,
            window,
        })
    }

    /// Override source value, or the measured drift if the source fails
    fn acquire(&mut self, measured: f64) -> (f64, bool) {
        let Some(source) = self.source.as_mut() else {
            return (measured, false);
        };
        match source.sample() {
            Ok(v) if v.is_finite() => {
                if self.source_failures > 0 {
                    debug!("Sample source recovered after {} failures", self.source_failures);
                    self.source_failures = 0;
                }
                (v, false)
            }
            other => {
                self.source_failures += 1;
                let reason = match other {
                    Ok(v) => format!("non-finite value {}", v),
                    Err(e) => e.to_string(),
                };
                if self.source_failures % coll_const::MAX_CONSECUTIVE_FAILURES == 0 {
                    error!(
                        "Sample source failing repeatedly (count: {}): {}",
                        self.source_failures, reason
                    );
                } else {
                    warn!("Sample source failed, using measured drift: {}", reason);
                }
                (measured, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::source::MockSampleSource;
    use crate::data::{MemoryDriftLog, MockDriftLog};
    use crate::error::DriftError;
    use crate::hal::SteppedDriftClock;

    fn config(warmup: usize, capacity: usize) -> CollectorConfig {
        CollectorConfig {
            interval_ms: 100,
            buffer_capacity: capacity,
            warmup_samples: warmup,
        }
    }

    fn collector(warmup: usize, capacity: usize) -> Collector {
        Collector::new(
            config(warmup, capacity),
            Box::new(SteppedDriftClock::new(0.1, 12.0)),
            Box::new(MemoryDriftLog::default()),
            DriftPredictor::kalman(),
        )
    }

    #[test]
    fn test_warmup_then_running() {
        let mut c = collector(10, 100);
        assert_eq!(c.state(), CollectorState::Idle);
        for _ in 0..10 {
            assert_eq!(c.tick(), TickOutcome::Discarded);
        }
        assert_eq!(c.state(), CollectorState::Running);
        match c.tick() {
            TickOutcome::Recorded(report) => {
                assert!((report.record.drift_ppm - 12.0).abs() < 1e-6);
                assert!(!report.source_fallback);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(c.recorded(), 1);
    }

    #[test]
    fn test_stopped_collector_does_nothing() {
        let mut c = collector(0, 10);
        c.tick();
        c.stop();
        assert_eq!(c.tick(), TickOutcome::Stopped);
        assert_eq!(c.recorded(), 1);
    }

    #[test]
    fn test_stats_on_wrap() {
        let mut c = collector(0, 5);
        let mut windows = 0;
        for i in 1..=11 {
            if let TickOutcome::Recorded(r) = c.tick() {
                if let Some(w) = r.window {
                    windows += 1;
                    assert!(i % 5 == 0);
                    assert!((w.stats.mean - 12.0).abs() < 1e-6);
                }
            }
        }
        assert_eq!(windows, 2);
    }

    #[test]
    fn test_failing_source_falls_back() {
        let mut source = MockSampleSource::new();
        let mut calls = 0;
        source.expect_sample().times(3).returning(move || {
            calls += 1;
            match calls {
                1 => Ok(3.0),
                2 => Err(DriftError::sample_source("sensor unplugged")),
                _ => Ok(f64::NAN),
            }
        });
        let mut c = collector(0, 10).with_source(Box::new(source));

        let drifts: Vec<(f64, bool)> = (0..3)
            .map(|_| match c.tick() {
                TickOutcome::Recorded(r) => (r.record.drift_ppm, r.source_fallback),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(drifts[0], (3.0, false));
        assert!((drifts[1].0 - 12.0).abs() < 1e-6 && drifts[1].1);
        assert!((drifts[2].0 - 12.0).abs() < 1e-6 && drifts[2].1);
    }

    #[test]
    fn test_log_failure_does_not_halt() {
        let mut log = MockDriftLog::new();
        log.expect_append()
            .returning(|_| Err(DriftError::generic("disk full")));
        let mut c = Collector::new(
            config(0, 10),
            Box::new(SteppedDriftClock::new(0.1, 1.0)),
            Box::new(log),
            DriftPredictor::adaptive(),
        );
        for _ in 0..4 {
            assert!(matches!(c.tick(), TickOutcome::Recorded(_)));
        }
        assert_eq!(c.log_failures(), 4);
    }

    #[test]
    fn test_remaining_interval_never_negative() {
        let interval = Duration::from_millis(100);
        assert_eq!(remaining_interval(interval, Duration::from_millis(30)), Duration::from_millis(70));
        assert_eq!(remaining_interval(interval, Duration::from_millis(250)), Duration::ZERO);
    }
}
