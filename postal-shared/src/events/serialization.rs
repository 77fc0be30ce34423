/// Shipment change serialization for Redis streams
///
/// Stream entries are flat string maps:
///
/// ```text
/// shipment_id: "42"
/// sender_id: "7"            (empty when the sender was deleted)
/// status: "in_transit"
/// payload: "{\"id\":42,...}"
/// ts: "2025-01-03T12:00:00+00:00"
/// ```
///
/// `sender_id` is duplicated outside the payload so consumers can filter
/// without parsing JSON.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::ShipmentChange;

/// Stream every shipment change is appended to
pub const SHIPMENT_STREAM_KEY: &str = "shipments:updates";

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field value for {field}: {error}")]
    InvalidValue { field: &'static str, error: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub fn serialize_change(
    change: &ShipmentChange,
) -> Result<HashMap<String, String>, SerializationError> {
    let mut fields = HashMap::new();

    fields.insert("shipment_id".to_string(), change.shipment.id.to_string());
    fields.insert(
        "sender_id".to_string(),
        change
            .shipment
            .sender_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
    );
    fields.insert("status".to_string(), change.shipment.status.clone());
    fields.insert(
        "payload".to_string(),
        serde_json::to_string(&change.shipment)?,
    );
    fields.insert("ts".to_string(), change.ts.to_rfc3339());

    Ok(fields)
}

pub fn deserialize_change(
    fields: &HashMap<String, String>,
) -> Result<ShipmentChange, SerializationError> {
    let payload = required(fields, "payload")?;
    let shipment: crate::models::shipment::Shipment = serde_json::from_str(payload)?;

    let ts = DateTime::parse_from_rfc3339(required(fields, "ts")?)
        .map_err(|e| SerializationError::InvalidValue {
            field: "ts",
            error: e.to_string(),
        })?
        .with_timezone(&Utc);

    let shipment_id: i64 = required(fields, "shipment_id")?.parse().map_err(
        |e: std::num::ParseIntError| SerializationError::InvalidValue {
            field: "shipment_id",
            error: e.to_string(),
        },
    )?;

    if shipment_id != shipment.id {
        return Err(SerializationError::InvalidValue {
            field: "shipment_id",
            error: format!("payload carries id {}", shipment.id),
        });
    }

    Ok(ShipmentChange { shipment, ts })
}

/// Reads the sender id without touching the payload
pub fn sender_of(fields: &HashMap<String, String>) -> Option<i64> {
    fields.get("sender_id").and_then(|s| s.parse().ok())
}

fn required<'a>(
    fields: &'a HashMap<String, String>,
    name: &'static str,
) -> Result<&'a str, SerializationError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or(SerializationError::MissingField(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::shipment::tests::sample;

    #[test]
    fn test_serialized_fields() {
        let change = ShipmentChange::new(sample(42, "in_transit").without_summaries());
        let fields = serialize_change(&change).unwrap();

        assert_eq!(fields["shipment_id"], "42");
        assert_eq!(fields["sender_id"], "1");
        assert_eq!(fields["status"], "in_transit");
        assert_eq!(sender_of(&fields), Some(1));

        let decoded = deserialize_change(&fields).unwrap();
        assert_eq!(decoded.shipment, change.shipment);
        assert!(decoded.shipment.sender.is_none());
    }

    #[test]
    fn test_deleted_sender_serializes_empty() {
        let mut shipment = sample(3, "pending").without_summaries();
        shipment.sender_id = None;
        let fields = serialize_change(&ShipmentChange::new(shipment)).unwrap();

        assert_eq!(fields["sender_id"], "");
        assert_eq!(sender_of(&fields), None);
    }

    #[test]
    fn test_missing_payload_is_rejected() {
        let mut fields = serialize_change(&ShipmentChange::new(sample(1, "pending"))).unwrap();
        fields.remove("payload");

        assert!(matches!(
            deserialize_change(&fields),
            Err(SerializationError::MissingField("payload"))
        ));
    }

    #[test]
    fn test_mismatched_id_is_rejected() {
        let mut fields = serialize_change(&ShipmentChange::new(sample(1, "pending"))).unwrap();
        fields.insert("shipment_id".to_string(), "2".to_string());

        assert!(matches!(
            deserialize_change(&fields),
            Err(SerializationError::InvalidValue { field: "shipment_id", .. })
        ));
    }
}
