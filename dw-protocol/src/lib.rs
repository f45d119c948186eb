//! Shared wire types for Driftwatch
//!
//! Two messages cross node boundaries:
//! - [`TmbMessage`]: a timestamped payload carrying the sender's drift fingerprint
//! - [`Beacon`]: a reference-time broadcast with the sender's sync parameters
//!
//! Field names here are the compatibility surface. Do not rename them.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use dw_error::{DriftError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum encoded message size (64KB)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Length of a hex-encoded SHA-256 fingerprint
pub const FINGERPRINT_HEX_LEN: usize = 64;

const HEADER_FIELDS: &[&str] = &["message_id", "timestamp", "fingerprint"];
const BODY_FIELDS: &[&str] = &["payload", "authorization"];

// ============================================================================
// Temporal Message
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmbHeader {
    pub message_id: String,
    /// ISO-8601 creation time, UTC
    pub timestamp: String,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmbBody {
    pub payload: Value,
    /// Reserved for an external trust layer; always present on the wire, may be null
    pub authorization: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmbMessage {
    pub header: TmbHeader,
    pub body: TmbBody,
}

impl TmbHeader {
    pub fn new(message_id: impl Into<String>, timestamp: DateTime<Utc>, fingerprint: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            timestamp: format_timestamp(timestamp),
            fingerprint: fingerprint.into(),
        }
    }
}

impl TmbMessage {
    pub fn new(header: TmbHeader, payload: Value) -> Self {
        Self {
            header,
            body: TmbBody {
                payload,
                authorization: None,
            },
        }
    }

    /// Structurally check a raw JSON value and extract a typed message.
    ///
    /// A missing section or field is a hard error, reported before any
    /// type checks so the caller learns exactly what is absent.
    pub fn from_value(value: &Value) -> Result<Self> {
        check_structure(value)?;

        let header = &value["header"];
        let body = &value["body"];

        let message_id = match &header["message_id"] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(DriftError::generic(format!(
                    "message_id must be a string, got {}",
                    other
                )))
            }
        };
        let timestamp = header["timestamp"]
            .as_str()
            .ok_or_else(|| DriftError::InvalidTimestamp(header["timestamp"].to_string()))?
            .to_string();
        let fingerprint = header["fingerprint"]
            .as_str()
            .ok_or_else(|| DriftError::InvalidFingerprint(header["fingerprint"].to_string()))?
            .to_string();

        let authorization = match &body["authorization"] {
            Value::Null => None,
            v => Some(v.clone()),
        };

        Ok(Self {
            header: TmbHeader {
                message_id,
                timestamp,
                fingerprint,
            },
            body: TmbBody {
                payload: body["payload"].clone(),
                authorization,
            },
        })
    }

    /// Parse and structurally check an encoded message
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.len() > MAX_MESSAGE_SIZE {
            return Err(DriftError::MessageTooLarge {
                size: raw.len(),
                max_size: MAX_MESSAGE_SIZE,
            });
        }
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "header": {
                "message_id": self.header.message_id,
                "timestamp": self.header.timestamp,
                "fingerprint": self.header.fingerprint,
            },
            "body": {
                "payload": self.body.payload,
                "authorization": self.body.authorization,
            },
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value())?)
    }

    /// Header timestamp as a UTC instant
    pub fn parsed_timestamp(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.header.timestamp)
    }
}

/// Verify the two sections and their five fields are all present
pub fn check_structure(value: &Value) -> Result<()> {
    for (section, fields) in [("header", HEADER_FIELDS), ("body", BODY_FIELDS)] {
        let obj = value
            .get(section)
            .and_then(Value::as_object)
            .ok_or_else(|| DriftError::MissingSection(section.to_string()))?;
        for field in fields {
            if !obj.contains_key(*field) {
                return Err(DriftError::missing_field(section, *field));
            }
        }
    }
    Ok(())
}

/// Format an instant the way message headers carry it
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accept RFC 3339 with an offset, or a naive ISO-8601 time taken as UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| DriftError::InvalidTimestamp(raw.to_string()))
}

// ============================================================================
// Beacon
// ============================================================================

/// Synchronization parameters advertised alongside a beacon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncParameters {
    /// Seconds until the sender plans its next sync
    pub sync_interval: f64,
    /// Std of the sender's recent residuals
    pub stability_factor: f64,
    pub last_drift: Option<f64>,
    pub residual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    pub node_id: String,
    /// Sender's corrected clock reading, seconds
    pub beacon_time: f64,
    pub sync_params: SyncParameters,
}

impl Beacon {
    /// Validate beacon contents before handing them to a synchronizer
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.node_id.is_empty() {
            return Err("Beacon node_id cannot be empty".to_string());
        }
        if !self.beacon_time.is_finite() {
            return Err(format!("Beacon time must be finite, got {}", self.beacon_time));
        }
        if !(self.sync_params.sync_interval.is_finite() && self.sync_params.sync_interval > 0.0) {
            return Err(format!(
                "Beacon sync_interval must be positive, got {}",
                self.sync_params.sync_interval
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_value() -> Value {
        json!({
            "header": {
                "message_id": "abc",
                "timestamp": "2024-05-01T12:00:00.250000",
                "fingerprint": "00".repeat(32),
            },
            "body": { "payload": {"k": 1}, "authorization": null },
        })
    }

    #[test]
    fn test_from_value_roundtrips_fields() {
        let msg = TmbMessage::from_value(&sample_value()).unwrap();
        assert_eq!(msg.header.message_id, "abc");
        assert_eq!(msg.body.payload, json!({"k": 1}));
        assert!(msg.body.authorization.is_none());
        assert_eq!(msg.to_value(), sample_value());
    }

    #[test]
    fn test_missing_section() {
        let mut v = sample_value();
        v.as_object_mut().unwrap().remove("body");
        let err = TmbMessage::from_value(&v).unwrap_err();
        assert!(matches!(err, DriftError::MissingSection(ref s) if s == "body"));
    }

    #[test]
    fn test_missing_field_reports_section() {
        let mut v = sample_value();
        v["header"].as_object_mut().unwrap().remove("fingerprint");
        let err = TmbMessage::from_value(&v).unwrap_err();
        assert_eq!(err.to_string(), "Missing field fingerprint in header");
    }

    #[test]
    fn test_null_authorization_still_required() {
        let mut v = sample_value();
        v["body"].as_object_mut().unwrap().remove("authorization");
        assert!(matches!(
            TmbMessage::from_value(&v),
            Err(DriftError::MissingField { .. })
        ));
    }

    #[test]
    fn test_parse_naive_and_offset_timestamps() {
        let naive = parse_timestamp("2024-05-01T12:00:00.250000").unwrap();
        let zulu = parse_timestamp("2024-05-01T12:00:00.250Z").unwrap();
        assert_eq!(naive, zulu);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_oversized_message_rejected() {
        let raw = " ".repeat(MAX_MESSAGE_SIZE + 1);
        assert!(matches!(
            TmbMessage::from_json(&raw),
            Err(DriftError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_beacon_validation() {
        let mut beacon = Beacon {
            node_id: "node-a".into(),
            beacon_time: 12.5,
            sync_params: SyncParameters {
                sync_interval: 60.0,
                stability_factor: 0.0,
                last_drift: None,
                residual: None,
            },
        };
        assert!(beacon.validate().is_ok());
        beacon.node_id.clear();
        assert!(beacon.validate().is_err());
    }
}
