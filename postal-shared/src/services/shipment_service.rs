use std::ops::Deref;

use sqlx::PgPool;
use tracing::{debug, warn};

use crate::events::ShipmentChange;
use crate::models::shipment::{Shipment, ShipmentPatch, ShipmentStatus};
use crate::redis::feed_writer::FeedWriter;
use crate::store::{Action, Gateway, Record, StoreError};

/// Select list shared by every joined shipment query
///
/// Left joins keep shipments whose sender or method has been deleted.
const JOINED_SELECT: &str = r#"
    SELECT s.id, s.created_at, s.status, s.to_address, s.weight, s.sender_id, s.method_id,
           u.email AS sender_email, u.address AS sender_address,
           m.name AS method_name, m.cost AS method_cost
    FROM shipments s
    LEFT JOIN users u ON u.id = s.sender_id
    LEFT JOIN shipping_methods m ON m.id = s.method_id
"#;

/// Status update returning the joined row in one round trip
const UPDATE_STATUS: &str = r#"
    WITH s AS (
        UPDATE shipments SET status = $2 WHERE id = $1
        RETURNING id, created_at, status, to_address, weight, sender_id, method_id
    )
    SELECT s.id, s.created_at, s.status, s.to_address, s.weight, s.sender_id, s.method_id,
           u.email AS sender_email, u.address AS sender_address,
           m.name AS method_name, m.cost AS method_cost
    FROM s
    LEFT JOIN users u ON u.id = s.sender_id
    LEFT JOIN shipping_methods m ON m.id = s.method_id
"#;

/// Shipments table access
///
/// Listing queries return rows with joined sender and method summaries.
/// `get_by_id` and `create` come from the gateway and return plain rows.
#[derive(Clone)]
pub struct ShipmentService {
    gateway: Gateway<Shipment>,
    feed: Option<FeedWriter>,
}

impl ShipmentService {
    pub fn new(pool: PgPool, feed: Option<FeedWriter>) -> Self {
        Self {
            gateway: Gateway::new(pool),
            feed,
        }
    }

    /// Every shipment with summaries, newest first
    pub async fn list_all(&self) -> Result<Vec<Shipment>, StoreError> {
        let sql = format!("{} ORDER BY s.created_at DESC", JOINED_SELECT);

        sqlx::query_as::<_, Shipment>(&sql)
            .fetch_all(self.gateway.pool())
            .await
            .map_err(|e| StoreError::database(Shipment::TABLE, Action::Fetching, e))
    }

    /// Shipments sent by `user_id`, newest first
    pub async fn get_by_user(&self, user_id: i64) -> Result<Vec<Shipment>, StoreError> {
        let sql = format!(
            "{} WHERE s.sender_id = $1 ORDER BY s.created_at DESC",
            JOINED_SELECT
        );

        sqlx::query_as::<_, Shipment>(&sql)
            .bind(user_id)
            .fetch_all(self.gateway.pool())
            .await
            .map_err(|e| StoreError::database(Shipment::TABLE, Action::Fetching, e))
    }

    /// Shipments currently in `status`, newest first
    pub async fn get_by_status(&self, status: ShipmentStatus) -> Result<Vec<Shipment>, StoreError> {
        let sql = format!(
            "{} WHERE s.status = $1 ORDER BY s.created_at DESC",
            JOINED_SELECT
        );

        sqlx::query_as::<_, Shipment>(&sql)
            .bind(status.as_str())
            .fetch_all(self.gateway.pool())
            .await
            .map_err(|e| StoreError::database(Shipment::TABLE, Action::Fetching, e))
    }

    /// Sets only the status column and returns the joined row
    ///
    /// Any status is accepted from any other.
    pub async fn update_status(
        &self,
        id: i64,
        status: ShipmentStatus,
    ) -> Result<Shipment, StoreError> {
        let shipment = sqlx::query_as::<_, Shipment>(UPDATE_STATUS)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(self.gateway.pool())
            .await
            .map_err(|e| StoreError::database(Shipment::TABLE, Action::Updating, e))?
            .ok_or(StoreError::NotFound {
                table: Shipment::TABLE,
                action: Action::Updating,
                id,
            })?;

        debug!(shipment_id = id, status = %status, "Shipment status updated");
        self.publish(&shipment).await;

        Ok(shipment)
    }

    /// Field update through the gateway, followed by a change event
    pub async fn update(&self, id: i64, patch: ShipmentPatch) -> Result<Shipment, StoreError> {
        let shipment = self.gateway.update(id, patch).await?;
        self.publish(&shipment).await;
        Ok(shipment)
    }

    /// Pushes the plain row to the change feed, if one is configured
    async fn publish(&self, shipment: &Shipment) {
        let Some(feed) = &self.feed else {
            return;
        };

        let change = ShipmentChange::new(shipment.clone().without_summaries());
        if let Err(e) = feed.publish(&change).await {
            warn!(
                shipment_id = shipment.id,
                error = %e,
                "Failed to publish shipment change"
            );
        }
    }
}

impl Deref for ShipmentService {
    type Target = Gateway<Shipment>;

    fn deref(&self) -> &Self::Target {
        &self.gateway
    }
}
