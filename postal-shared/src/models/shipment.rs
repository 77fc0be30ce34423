/// Shipment model
///
/// Shipments are created in `pending` and move through the eight-value
/// status vocabulary by explicit transitions. They are never deleted by the
/// application; cancelling moves them to `cancelled`.
///
/// Joined queries attach a [`SenderSummary`] and a [`MethodSummary`]. Plain
/// gateway rows (create, get by id, change-feed payloads) carry neither, and
/// display code falls back to "Unknown".
///
/// # Schema
///
/// ```sql
/// CREATE TABLE shipments (
///     id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     status TEXT NOT NULL DEFAULT 'pending',
///     to_address TEXT NOT NULL,
///     weight DOUBLE PRECISION NOT NULL CHECK (weight > 0),
///     sender_id BIGINT REFERENCES users (id) ON DELETE SET NULL,
///     method_id BIGINT REFERENCES shipping_methods (id) ON DELETE SET NULL
/// );
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Postgres, Row};

use crate::store::{FieldSet, FieldValue, Fields, Record};

/// Label shown for anything that cannot be resolved
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Shipment lifecycle stage
///
/// Any status may follow any other; there is no transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    FailedDelivery,
    Returned,
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 8] = [
        ShipmentStatus::Pending,
        ShipmentStatus::PickedUp,
        ShipmentStatus::InTransit,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::FailedDelivery,
        ShipmentStatus::Returned,
        ShipmentStatus::Cancelled,
    ];

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::PickedUp => "picked_up",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::OutForDelivery => "out_for_delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::FailedDelivery => "failed_delivery",
            ShipmentStatus::Returned => "returned",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "Pending",
            ShipmentStatus::PickedUp => "Picked Up",
            ShipmentStatus::InTransit => "In Transit",
            ShipmentStatus::OutForDelivery => "Out for Delivery",
            ShipmentStatus::Delivered => "Delivered",
            ShipmentStatus::FailedDelivery => "Failed Delivery",
            ShipmentStatus::Returned => "Returned",
            ShipmentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for status strings outside the vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown shipment status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ShipmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Label for a stored status, "Unknown" when unrecognized
pub fn status_label(status: &str) -> &'static str {
    ShipmentStatus::parse(status)
        .map(|s| s.label())
        .unwrap_or(UNKNOWN_LABEL)
}

/// Sender fields attached by joined queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderSummary {
    pub email: String,
    pub address: String,
}

/// Method fields attached by joined queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub name: String,
    pub cost: f64,
}

/// Shipment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: i64,
    pub created_at: DateTime<Utc>,

    /// Stored status text; see [`ShipmentStatus`]
    pub status: String,

    /// Destination address
    pub to_address: String,

    pub weight: f64,

    /// Owning user. `None` once that user has been deleted.
    pub sender_id: Option<i64>,

    /// Shipping method. `None` once that method has been deleted.
    pub method_id: Option<i64>,

    #[serde(default)]
    pub sender: Option<SenderSummary>,

    #[serde(default)]
    pub method: Option<MethodSummary>,
}

impl Shipment {
    pub fn status(&self) -> Option<ShipmentStatus> {
        ShipmentStatus::parse(&self.status)
    }

    pub fn status_label(&self) -> &'static str {
        status_label(&self.status)
    }

    pub fn sender_email(&self) -> &str {
        self.sender
            .as_ref()
            .map(|s| s.email.as_str())
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn method_name(&self) -> &str {
        self.method
            .as_ref()
            .map(|m| m.name.as_str())
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// Same row without the joined summaries
    pub fn without_summaries(mut self) -> Self {
        self.sender = None;
        self.method = None;
        self
    }
}

/// Reads a column that only joined queries select
fn joined_column<'r, T>(row: &'r PgRow, name: &str) -> Result<Option<T>, sqlx::Error>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    match row.try_get::<Option<T>, _>(name) {
        Ok(value) => Ok(value),
        Err(sqlx::Error::ColumnNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl<'r> FromRow<'r, PgRow> for Shipment {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let sender = match joined_column::<String>(row, "sender_email")? {
            Some(email) => Some(SenderSummary {
                email,
                address: joined_column::<String>(row, "sender_address")?.unwrap_or_default(),
            }),
            None => None,
        };

        let method = match joined_column::<String>(row, "method_name")? {
            Some(name) => Some(MethodSummary {
                name,
                cost: joined_column::<f64>(row, "method_cost")?.unwrap_or_default(),
            }),
            None => None,
        };

        Ok(Self {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            status: row.try_get("status")?,
            to_address: row.try_get("to_address")?,
            weight: row.try_get("weight")?,
            sender_id: row.try_get("sender_id")?,
            method_id: row.try_get("method_id")?,
            sender,
            method,
        })
    }
}

/// Input for creating a shipment
///
/// The status column is always written as `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShipment {
    pub sender_id: i64,
    pub to_address: String,
    pub weight: f64,
    pub method_id: i64,
}

/// Input for updating a shipment. Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmentPatch {
    pub status: Option<ShipmentStatus>,
    pub to_address: Option<String>,
    pub weight: Option<f64>,
    pub method_id: Option<i64>,
}

impl Fields for NewShipment {
    fn into_fields(self) -> Vec<(&'static str, FieldValue)> {
        FieldSet::new()
            .set("status", ShipmentStatus::Pending.as_str())
            .set("to_address", self.to_address)
            .set("weight", self.weight)
            .set("sender_id", self.sender_id)
            .set("method_id", self.method_id)
            .finish()
    }
}

impl Fields for ShipmentPatch {
    fn into_fields(self) -> Vec<(&'static str, FieldValue)> {
        FieldSet::new()
            .set_opt("status", self.status.map(|s| s.as_str()))
            .set_opt("to_address", self.to_address)
            .set_opt("weight", self.weight)
            .set_opt("method_id", self.method_id)
            .finish()
    }
}

impl Record for Shipment {
    const TABLE: &'static str = "shipments";
    const COLUMNS: &'static str =
        "id, created_at, status, to_address, weight, sender_id, method_id";

    type New = NewShipment;
    type Patch = ShipmentPatch;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn sample(id: i64, status: &str) -> Shipment {
        Shipment {
            id,
            created_at: Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(),
            status: status.to_string(),
            to_address: "12 Harbour Rd".to_string(),
            weight: 2.0,
            sender_id: Some(1),
            method_id: Some(1),
            sender: Some(SenderSummary {
                email: "sender@example.com".to_string(),
                address: "1 Main St".to_string(),
            }),
            method: Some(MethodSummary {
                name: "Ground".to_string(),
                cost: 5.0,
            }),
        }
    }

    #[test]
    fn test_status_vocabulary_round_trips_through_text() {
        for status in ShipmentStatus::ALL {
            assert_eq!(ShipmentStatus::parse(status.as_str()), Some(status));
            assert_eq!(status.as_str().parse::<ShipmentStatus>(), Ok(status));
        }
        assert_eq!(ShipmentStatus::ALL.len(), 8);
    }

    #[test]
    fn test_labels() {
        assert_eq!(status_label("out_for_delivery"), "Out for Delivery");
        assert_eq!(status_label("picked_up"), "Picked Up");
        assert_eq!(status_label("lost_at_sea"), "Unknown");
        assert_eq!(status_label("Pending"), "Unknown");
        assert!("lost".parse::<ShipmentStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_stored_names() {
        let json = serde_json::to_string(&ShipmentStatus::FailedDelivery).unwrap();
        assert_eq!(json, "\"failed_delivery\"");
    }

    #[test]
    fn test_new_shipment_always_pending() {
        let fields = NewShipment {
            sender_id: 3,
            to_address: "9 Elm St".to_string(),
            weight: 5.5,
            method_id: 2,
        }
        .into_fields();

        assert_eq!(fields[0], ("status", FieldValue::Text("pending".to_string())));
    }

    #[test]
    fn test_missing_summaries_render_unknown() {
        let shipment = sample(7, "delivered").without_summaries();
        assert_eq!(shipment.sender_email(), "Unknown");
        assert_eq!(shipment.method_name(), "Unknown");
        assert_eq!(shipment.status_label(), "Delivered");
    }

    #[test]
    fn test_payload_without_summaries_deserializes() {
        let json = serde_json::json!({
            "id": 4,
            "created_at": "2024-03-10T12:00:00Z",
            "status": "in_transit",
            "to_address": "5 Pier St",
            "weight": 1.5,
            "sender_id": 2,
            "method_id": null
        });

        let shipment: Shipment = serde_json::from_value(json).unwrap();
        assert_eq!(shipment.status(), Some(ShipmentStatus::InTransit));
        assert!(shipment.sender.is_none());
        assert!(shipment.method_id.is_none());
    }
}
