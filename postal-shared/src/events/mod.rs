/// Shipment change events
///
/// Every shipment update is published as a [`ShipmentChange`] on a Redis
/// stream. Dashboards subscribe through a [`listener::ChangeListener`] and
/// receive [`ShipmentNotification`]s.
///
/// ```text
/// ShipmentService::update_status
///     │ XADD shipments:updates
///     ▼
/// Redis stream ──> ChangeListener (XREAD BLOCK) ──> SSE / dashboard view
/// ```

pub mod listener;
pub mod serialization;

pub use listener::{ChangeListener, FeedError, FeedScope, Subscription};
pub use serialization::{
    deserialize_change, serialize_change, SerializationError, SHIPMENT_STREAM_KEY,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::shipment::Shipment;

/// One update to a shipment row
///
/// The payload is the plain row. It never carries the joined sender or
/// method summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentChange {
    pub shipment: Shipment,
    pub ts: DateTime<Utc>,
}

impl ShipmentChange {
    pub fn new(shipment: Shipment) -> Self {
        Self {
            shipment,
            ts: Utc::now(),
        }
    }
}

/// What a dashboard shows for a change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentNotification {
    /// "Shipment #N status updated to S"
    pub message: String,

    /// Row that replaces the local copy
    pub shipment: Shipment,
}

impl From<ShipmentChange> for ShipmentNotification {
    fn from(change: ShipmentChange) -> Self {
        Self {
            message: format!(
                "Shipment #{} status updated to {}",
                change.shipment.id, change.shipment.status
            ),
            shipment: change.shipment,
        }
    }
}
