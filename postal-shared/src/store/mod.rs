/// Generic table access
///
/// A [`Gateway`] is bound to one table through the [`Record`] trait and
/// provides the five operations every table supports: list, get, create,
/// update and delete. Domain services in [`crate::services`] wrap a gateway
/// and add their own queries.
///
/// # Example
///
/// ```no_run
/// use postal_shared::models::shipping_method::{NewShippingMethod, ShippingMethod};
/// use postal_shared::store::Gateway;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), postal_shared::store::StoreError> {
/// let methods: Gateway<ShippingMethod> = Gateway::new(pool);
///
/// let express = methods
///     .create(NewShippingMethod { name: "Express".to_string(), cost: 24.5 })
///     .await?;
/// assert!(methods.get_by_id(express.id).await?.is_some());
/// # Ok(())
/// # }
/// ```

pub mod error;
pub mod fields;
pub mod gateway;

pub use error::{Action, StoreError};
pub use fields::{FieldSet, FieldValue, Fields};
pub use gateway::{Gateway, Record};
