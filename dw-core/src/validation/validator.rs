use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dw_protocol::{TmbHeader, TmbMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::constants::{fingerprint as fp_const, validator as val_const};
use crate::error::{DriftError, Result};
use crate::fingerprinting::{generate_fingerprint, Fingerprint, FingerprintSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_max_drift_ppm")]
    pub max_drift_ppm: f64,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: usize,
}

fn default_max_drift_ppm() -> f64 {
    val_const::MAX_DRIFT_PPM
}

fn default_window_seconds() -> usize {
    val_const::WINDOW_SECONDS
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_drift_ppm: default_max_drift_ppm(),
            window_seconds: default_window_seconds(),
        }
    }
}

impl ValidatorConfig {
    /// `max_drift_ppm * 1e-6 * window_seconds * 2`, in seconds
    pub fn max_delay_secs(&self) -> f64 {
        self.max_drift_ppm * 1e-6 * self.window_seconds as f64 * 2.0
    }

    /// Retained history length
    pub fn history_capacity(&self) -> usize {
        (self.window_seconds * fp_const::SAMPLES_PER_SECOND).max(1)
    }
}

/// Result of checking one structurally valid message
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationOutcome {
    pub fingerprint_match: bool,
    pub fresh: bool,
    /// Validation time minus message time, seconds
    pub age_secs: f64,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.fingerprint_match && self.fresh
    }
}

#[derive(Debug, Clone)]
pub struct TmbValidator {
    config: ValidatorConfig,
    history: VecDeque<f64>,
}

impl TmbValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_capacity()),
            config,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Append a drift value, discarding the oldest beyond capacity
    pub fn record(&mut self, drift_ppm: f64) {
        if !drift_ppm.is_finite() {
            warn!(drift = drift_ppm, "Validator ignoring non-finite drift value");
            return;
        }
        if self.history.len() >= self.config.history_capacity() {
            self.history.pop_front();
        }
        self.history.push_back(drift_ppm);
    }

    pub fn history(&self) -> Vec<f64> {
        self.history.iter().copied().collect()
    }

    pub fn max_delay_secs(&self) -> f64 {
        self.config.max_delay_secs()
    }

    /// Fingerprint of the current history; an empty history is an error
    pub fn expected_fingerprint(&self) -> Result<Fingerprint> {
        generate_fingerprint(&self.history(), self.config.window_seconds)
    }

    /// Full check against the current wall clock
    pub fn validate_message(&self, message: &Value) -> Result<bool> {
        self.validate_message_at(message, Utc::now())
            .map(|outcome| outcome.is_valid())
    }

    /// Record `current_drift` after the structural check, then validate
    pub fn validate_with_drift(&mut self, message: &Value, current_drift: f64) -> Result<bool> {
        dw_protocol::check_structure(message)?;
        self.record(current_drift);
        self.validate_message(message)
    }

    /// Check `message` as of `now`.
    ///
    /// Structural problems and an unparsable timestamp are errors. A
    /// fingerprint mismatch or a stale message is a negative outcome, as is
    /// a validator with no recorded drift yet.
    pub fn validate_message_at(&self, message: &Value, now: DateTime<Utc>) -> Result<ValidationOutcome> {
        let message = TmbMessage::from_value(message)?;
        let sent_at = message.parsed_timestamp()?;

        let fingerprint_match = match self.expected_fingerprint() {
            Ok(expected) => message.header.fingerprint == expected.to_hex(),
            Err(DriftError::EmptyWindow) => {
                warn!(message_id = %message.header.message_id, "No drift history to validate against");
                false
            }
            Err(e) => return Err(e),
        };

        let age_secs = (now - sent_at)
            .num_microseconds()
            .map(|us| us as f64 / 1e6)
            .unwrap_or(f64::INFINITY);
        let fresh = age_secs.abs() <= self.max_delay_secs();

        debug!(
            message_id = %message.header.message_id,
            fingerprint_match,
            fresh,
            age_secs,
            max_delay = self.max_delay_secs(),
            "Validated message"
        );

        Ok(ValidationOutcome {
            fingerprint_match,
            fresh,
            age_secs,
        })
    }

    /// Build a message fingerprinted with this validator's own history
    pub fn create_message(&self, payload: Value) -> Result<TmbMessage> {
        create_message(payload, &self.history(), self.config.window_seconds)
    }
}

impl Default for TmbValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl FingerprintSource for TmbValidator {
    fn label(&self) -> String {
        "validator".to_string()
    }

    fn fingerprint(&self) -> Result<Fingerprint> {
        self.expected_fingerprint()
    }
}

/// Build a message stamped with the current time
pub fn create_message(payload: Value, drift_samples: &[f64], window_seconds: usize) -> Result<TmbMessage> {
    create_message_at(payload, drift_samples, window_seconds, Utc::now())
}

/// Build a message stamped with `now`; the id is the SHA-256 of the instant
pub fn create_message_at(
    payload: Value,
    drift_samples: &[f64],
    window_seconds: usize,
    now: DateTime<Utc>,
) -> Result<TmbMessage> {
    let fingerprint = generate_fingerprint(drift_samples, window_seconds)?;
    let instant = now.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);
    let message_id = hex::encode(Sha256::digest(instant.as_bytes()));
    let header = TmbHeader::new(message_id, now, fingerprint.to_hex());
    Ok(TmbMessage::new(header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriftError;
    use chrono::Duration;
    use serde_json::json;

    fn fed_validator(samples: &[f64]) -> TmbValidator {
        let mut v = TmbValidator::default();
        for s in samples {
            v.record(*s);
        }
        v
    }

    fn drift_samples() -> Vec<f64> {
        (0..120).map(|i| 2.0 + (i as f64 * 0.3).sin()).collect()
    }

    #[test]
    fn test_max_delay() {
        let v = TmbValidator::default();
        assert!((v.max_delay_secs() - 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_history_capped() {
        let v = fed_validator(&vec![1.0; 1000]);
        assert_eq!(v.history().len(), 300);
    }

    #[test]
    fn test_fresh_matching_message_is_valid() {
        let samples = drift_samples();
        let v = fed_validator(&samples);
        let now = Utc::now();
        let msg = create_message_at(json!({"op": "ping"}), &samples, 30, now).unwrap();
        let outcome = v.validate_message_at(&msg.to_value(), now).unwrap();
        assert!(outcome.is_valid());
        assert!(outcome.age_secs.abs() < 1e-5);
    }

    #[test]
    fn test_stale_message_rejected_despite_match() {
        let samples = drift_samples();
        let v = fed_validator(&samples);
        let now = Utc::now();
        let msg = create_message_at(json!({}), &samples, 30, now - Duration::hours(1)).unwrap();
        let outcome = v.validate_message_at(&msg.to_value(), now).unwrap();
        assert!(outcome.fingerprint_match);
        assert!(!outcome.fresh);
        assert!(!outcome.is_valid());
    }

    #[test]
    fn test_fingerprint_mismatch_is_not_an_error() {
        let v = fed_validator(&drift_samples());
        let now = Utc::now();
        let msg = create_message_at(json!({}), &[9.0, 9.5], 30, now).unwrap();
        let outcome = v.validate_message_at(&msg.to_value(), now).unwrap();
        assert!(!outcome.fingerprint_match);
        assert!(outcome.fresh);
    }

    #[test]
    fn test_structural_errors_surface() {
        let v = fed_validator(&drift_samples());
        let err = v.validate_message(&json!({"header": {}})).unwrap_err();
        assert!(matches!(err, DriftError::MissingField { .. }));
        let err = v.validate_message(&json!({"body": {}})).unwrap_err();
        assert!(matches!(err, DriftError::MissingSection(ref s) if s == "header"));
    }

    #[test]
    fn test_empty_history_rejects_without_error() {
        let v = TmbValidator::default();
        let msg = create_message(json!({}), &[1.0], 30).unwrap();
        assert!(!v.validate_message(&msg.to_value()).unwrap());

        let sent_at = msg.parsed_timestamp().unwrap();
        let outcome = v.validate_message_at(&msg.to_value(), sent_at).unwrap();
        assert!(!outcome.fingerprint_match);
        assert!(outcome.fresh);
        assert!(matches!(v.expected_fingerprint(), Err(DriftError::EmptyWindow)));
    }

    #[test]
    fn test_validate_with_drift_records_only_after_structure_check() {
        let mut v = TmbValidator::default();
        assert!(v.validate_with_drift(&json!({}), 1.0).is_err());
        assert!(v.history().is_empty());

        let msg = create_message(json!({}), &[1.0], 30).unwrap();
        assert!(v.validate_with_drift(&msg.to_value(), 1.0).is_ok());
        assert_eq!(v.history(), vec![1.0]);

        let sent_at = msg.parsed_timestamp().unwrap();
        assert!(v.validate_message_at(&msg.to_value(), sent_at).unwrap().is_valid());
    }

    #[test]
    fn test_message_ids_differ_per_instant() {
        let now = Utc::now();
        let a = create_message_at(json!({}), &[1.0], 30, now).unwrap();
        let b = create_message_at(json!({}), &[1.0], 30, now + Duration::milliseconds(1)).unwrap();
        assert_ne!(a.header.message_id, b.header.message_id);
        assert_eq!(a.header.message_id.len(), 64);
        assert!(a.body.authorization.is_none());
    }
}
