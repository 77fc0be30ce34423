/// API route handlers
///
/// - `health`: liveness and dependency status
/// - `auth`: sign-up, login, logout and token refresh
/// - `user`: the signed-in user's dashboard and settings
/// - `admin`: the admin dashboard and settings
/// - `feed`: live shipment updates over SSE

pub mod admin;
pub mod auth;
pub mod feed;
pub mod health;
pub mod user;

use postal_shared::models::shipment::Shipment;
use serde::Serialize;

/// Shipment as the dashboards display it
///
/// Adds the status label and the joined sender and method names, which read
/// "Unknown" when the row was not joined or the reference is gone.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentRow {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub status_label: &'static str,
    pub sender_email: String,
    pub method_name: String,
}

impl From<&Shipment> for ShipmentRow {
    fn from(shipment: &Shipment) -> Self {
        Self {
            status_label: shipment.status_label(),
            sender_email: shipment.sender_email().to_string(),
            method_name: shipment.method_name().to_string(),
            shipment: shipment.clone(),
        }
    }
}

impl From<Shipment> for ShipmentRow {
    fn from(shipment: Shipment) -> Self {
        Self::from(&shipment)
    }
}

pub(crate) fn rows<'a>(shipments: impl IntoIterator<Item = &'a Shipment>) -> Vec<ShipmentRow> {
    shipments.into_iter().map(ShipmentRow::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use postal_shared::models::shipment::{MethodSummary, SenderSummary};

    fn shipment() -> Shipment {
        Shipment {
            id: 12,
            created_at: chrono::Utc::now(),
            status: "in_transit".to_string(),
            to_address: "5 Elm St".to_string(),
            weight: 2.0,
            sender_id: Some(3),
            method_id: None,
            sender: Some(SenderSummary {
                email: "a@example.com".to_string(),
                address: "1 Main St".to_string(),
            }),
            method: None,
        }
    }

    #[test]
    fn test_row_labels() {
        let row = ShipmentRow::from(shipment());
        assert_eq!(row.status_label, "In Transit");
        assert_eq!(row.sender_email, "a@example.com");
        assert_eq!(row.method_name, "Unknown");
    }

    #[test]
    fn test_row_serializes_flat() {
        let mut s = shipment();
        s.method = Some(MethodSummary {
            name: "Express".to_string(),
            cost: 19.5,
        });
        let json = serde_json::to_value(ShipmentRow::from(s)).unwrap();

        assert_eq!(json["id"], 12);
        assert_eq!(json["status"], "in_transit");
        assert_eq!(json["method_name"], "Express");
    }
}
