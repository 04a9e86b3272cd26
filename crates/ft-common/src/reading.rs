//! Raw device readings and the ingestion-side value coercion policy.
//!
//! A [`Reading`] always carries an `f64`. Devices report loosely typed
//! payloads, so every raw value goes through [`coerce_value`] before it can
//! become a reading:
//!
//! - JSON numbers are accepted as-is
//! - strings are accepted when they trim-parse to a finite float
//! - booleans map to `1.0` / `0.0` (ignition and digital-input signals)
//! - null, arrays, objects, NaN and infinities are rejected

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::{DataPointTypeId, DeviceId};

/// A single timestamped scalar value for a device and data-point type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: DeviceId,

    /// For composite lookups this is the source type that supplied the value,
    /// not the composite type that was requested.
    pub data_point_type_id: DataPointTypeId,

    pub value: f64,

    pub recorded_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(
        device_id: DeviceId,
        data_point_type_id: DataPointTypeId,
        value: f64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Reading {
            device_id,
            data_point_type_id,
            value,
            recorded_at,
        }
    }

    /// Build a reading from a raw device payload, applying the coercion policy.
    pub fn from_raw(
        device_id: DeviceId,
        data_point_type_id: DataPointTypeId,
        raw: &serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self> {
        let value = coerce_value(raw).map_err(|reason| Error::NonNumericValue {
            device_id,
            type_id: data_point_type_id,
            reason,
        })?;
        Ok(Reading::new(device_id, data_point_type_id, value, recorded_at))
    }
}

/// Convert a raw payload into a finite `f64`, or explain why it cannot be.
pub fn coerce_value(raw: &serde_json::Value) -> std::result::Result<f64, String> {
    let value = match raw {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("number {} is not representable as f64", n))?,
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("string {:?} is not numeric", s))?,
        serde_json::Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        serde_json::Value::Null => return Err("null value".to_string()),
        serde_json::Value::Array(_) => return Err("array value".to_string()),
        serde_json::Value::Object(_) => return Err("object value".to_string()),
    };

    if !value.is_finite() {
        return Err(format!("non-finite value {}", value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce_value(&json!(12)), Ok(12.0));
        assert_eq!(coerce_value(&json!(-3.5)), Ok(-3.5));
    }

    #[test]
    fn test_coerce_numeric_strings() {
        assert_eq!(coerce_value(&json!(" 81.25 ")), Ok(81.25));
        assert_eq!(coerce_value(&json!("1e3")), Ok(1000.0));
        assert!(coerce_value(&json!("eighty")).is_err());
        assert!(coerce_value(&json!("")).is_err());
    }

    #[test]
    fn test_coerce_rejects_non_finite_strings() {
        assert!(coerce_value(&json!("NaN")).is_err());
        assert!(coerce_value(&json!("inf")).is_err());
    }

    #[test]
    fn test_coerce_booleans() {
        assert_eq!(coerce_value(&json!(true)), Ok(1.0));
        assert_eq!(coerce_value(&json!(false)), Ok(0.0));
    }

    #[test]
    fn test_coerce_rejects_structured_values() {
        assert!(coerce_value(&json!(null)).is_err());
        assert!(coerce_value(&json!([1, 2])).is_err());
        assert!(coerce_value(&json!({"v": 1})).is_err());
    }

    #[test]
    fn test_from_raw_error_carries_identity() {
        let err = Reading::from_raw(DeviceId(9), DataPointTypeId(3), &json!("n/a"), ts())
            .unwrap_err();
        match err {
            Error::NonNumericValue {
                device_id, type_id, ..
            } => {
                assert_eq!(device_id, DeviceId(9));
                assert_eq!(type_id, DataPointTypeId(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reading_serde_shape() {
        let reading = Reading::new(DeviceId(1), DataPointTypeId(2), 55.5, ts());
        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(value["device_id"], 1);
        assert_eq!(value["data_point_type_id"], 2);
        assert_eq!(value["value"], 55.5);
        assert_eq!(value["recorded_at"], "2024-03-01T12:00:00Z");
    }
}
