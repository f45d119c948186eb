//! Fixed-cadence sampling loop
//!
//! Drives the collector one tick at a time, sleeping only for whatever is
//! left of the interval after the tick itself. The shutdown flag is polled
//! once per tick, so a stop request takes effect within one interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dw_core::engine::DriftEstimator;
use dw_core::{generate_fingerprint, remaining_interval, Collector, TickOutcome, TmbValidator};
use tracing::{debug, info, warn};

/// Totals reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingSummary {
    pub ticks: u64,
    pub recorded: u64,
    pub fingerprints: u64,
}

pub async fn run_sampling_loop<P: DriftEstimator>(
    collector: &mut Collector<P>,
    validator: &mut TmbValidator,
    shutdown: Arc<AtomicBool>,
    max_samples: Option<u64>,
) -> SamplingSummary {
    let interval = collector.config().interval();
    let mut summary = SamplingSummary::default();
    collector.start();
    info!(interval_ms = interval.as_millis() as u64, ?max_samples, "Sampling loop starting");

    loop {
        if shutdown.load(Ordering::SeqCst) {
            info!("Sampling loop shutting down");
            break;
        }

        let started = Instant::now();
        summary.ticks += 1;

        match collector.tick() {
            TickOutcome::Stopped => break,
            TickOutcome::Discarded => {}
            TickOutcome::Recorded(report) => {
                summary.recorded += 1;
                validator.record(report.record.drift_ppm);

                if report.window.is_some() {
                    let window = collector.buffer().ordered();
                    match generate_fingerprint(&window, validator.config().window_seconds) {
                        Ok(fp) => {
                            summary.fingerprints += 1;
                            info!(fingerprint = %fp, samples = window.len(), "Window fingerprint");
                        }
                        Err(e) => warn!("Could not fingerprint drift window: {}", e),
                    }
                }

                if max_samples.is_some_and(|max| summary.recorded >= max) {
                    debug!(recorded = summary.recorded, "Sample limit reached");
                    break;
                }
            }
        }

        tokio::time::sleep(remaining_interval(interval, started.elapsed())).await;
    }

    collector.stop();
    info!(
        ticks = summary.ticks,
        recorded = summary.recorded,
        fingerprints = summary.fingerprints,
        log_failures = collector.log_failures(),
        "Sampling loop stopped"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_core::{CollectorConfig, CollectorState, DriftPredictor, MemoryDriftLog, SteppedDriftClock};

    fn collector(capacity: usize, warmup: usize) -> Collector {
        let config = CollectorConfig {
            interval_ms: 1,
            buffer_capacity: capacity,
            warmup_samples: warmup,
        };
        Collector::new(
            config,
            Box::new(SteppedDriftClock::new(0.1, 2.0)),
            Box::new(MemoryDriftLog::default()),
            DriftPredictor::default(),
        )
    }

    #[tokio::test]
    async fn test_stops_at_sample_limit() {
        let mut c = collector(4, 2);
        let mut validator = TmbValidator::default();
        let shutdown = Arc::new(AtomicBool::new(false));

        let summary = run_sampling_loop(&mut c, &mut validator, shutdown, Some(9)).await;

        assert_eq!(summary.recorded, 9);
        assert_eq!(summary.ticks, 11);
        assert_eq!(summary.fingerprints, 2);
        assert_eq!(validator.history().len(), 9);
        assert_eq!(c.state(), CollectorState::Stopped);
    }

    #[tokio::test]
    async fn test_warmup_ticks_keep_cadence() {
        let config = CollectorConfig {
            interval_ms: 5,
            buffer_capacity: 10,
            warmup_samples: 3,
        };
        let mut c = Collector::new(
            config,
            Box::new(SteppedDriftClock::new(0.1, 2.0)),
            Box::new(MemoryDriftLog::default()),
            DriftPredictor::default(),
        );
        let mut validator = TmbValidator::default();
        let shutdown = Arc::new(AtomicBool::new(false));

        let started = Instant::now();
        let summary = run_sampling_loop(&mut c, &mut validator, shutdown, Some(1)).await;

        assert_eq!(summary.ticks, 4);
        assert_eq!(summary.recorded, 1);
        assert!(started.elapsed() >= std::time::Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_shutdown_flag_checked_before_tick() {
        let mut c = collector(4, 0);
        let mut validator = TmbValidator::default();
        let shutdown = Arc::new(AtomicBool::new(true));

        let summary = run_sampling_loop(&mut c, &mut validator, shutdown, None).await;

        assert_eq!(summary, SamplingSummary::default());
        assert_eq!(c.recorded(), 0);
    }

    #[tokio::test]
    async fn test_flag_set_from_another_task() {
        let mut c = collector(100, 0);
        let mut validator = TmbValidator::default();
        let shutdown = Arc::new(AtomicBool::new(false));

        let flag = shutdown.clone();
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
        });

        let summary = run_sampling_loop(&mut c, &mut validator, shutdown, None).await;
        stopper.await.unwrap();
        assert!(summary.recorded > 0);
        assert_eq!(summary.recorded, c.recorded());
    }
}
