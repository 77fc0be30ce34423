/// Shipping method model
///
/// # Schema
///
/// ```sql
/// CREATE TABLE shipping_methods (
///     id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     name TEXT NOT NULL,
///     cost DOUBLE PRECISION NOT NULL CHECK (cost >= 0)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{FieldSet, FieldValue, Fields, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShippingMethod {
    pub id: i64,
    pub created_at: DateTime<Utc>,

    /// Display label
    pub name: String,

    /// Non-negative price charged per shipment
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShippingMethod {
    pub name: String,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingMethodPatch {
    pub name: Option<String>,
    pub cost: Option<f64>,
}

impl Fields for NewShippingMethod {
    fn into_fields(self) -> Vec<(&'static str, FieldValue)> {
        FieldSet::new()
            .set("name", self.name)
            .set("cost", self.cost)
            .finish()
    }
}

impl Fields for ShippingMethodPatch {
    fn into_fields(self) -> Vec<(&'static str, FieldValue)> {
        FieldSet::new()
            .set_opt("name", self.name)
            .set_opt("cost", self.cost)
            .finish()
    }
}

impl Record for ShippingMethod {
    const TABLE: &'static str = "shipping_methods";
    const COLUMNS: &'static str = "id, created_at, name, cost";

    type New = NewShippingMethod;
    type Patch = ShippingMethodPatch;
}
