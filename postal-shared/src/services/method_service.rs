use std::ops::Deref;

use sqlx::PgPool;

use crate::models::shipping_method::ShippingMethod;
use crate::store::{Action, Gateway, Record, StoreError};

/// Shipping methods table access
#[derive(Clone)]
pub struct ShippingMethodService {
    gateway: Gateway<ShippingMethod>,
}

impl ShippingMethodService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            gateway: Gateway::new(pool),
        }
    }

    /// Methods with `min <= cost <= max`, cheapest first
    ///
    /// An inverted range simply matches nothing.
    pub async fn get_by_cost_range(
        &self,
        min: f64,
        max: f64,
    ) -> Result<Vec<ShippingMethod>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE cost >= $1 AND cost <= $2 ORDER BY cost ASC",
            ShippingMethod::COLUMNS,
            ShippingMethod::TABLE
        );

        sqlx::query_as::<_, ShippingMethod>(&sql)
            .bind(min)
            .bind(max)
            .fetch_all(self.gateway.pool())
            .await
            .map_err(|e| StoreError::database(ShippingMethod::TABLE, Action::Fetching, e))
    }
}

impl Deref for ShippingMethodService {
    type Target = Gateway<ShippingMethod>;

    fn deref(&self) -> &Self::Target {
        &self.gateway
    }
}
