/// Domain services
///
/// Each service owns a [`Gateway`](crate::store::Gateway) for its table and
/// dereferences to it, so the plain CRUD contract is always available.
/// Table-specific queries are inherent methods; where a service defines a
/// method with the same name as the gateway (shipment `list_all`, `update`)
/// the service version wins.
///
/// # Example
///
/// ```no_run
/// use postal_shared::models::shipment::ShipmentStatus;
/// use postal_shared::services::Services;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), postal_shared::store::StoreError> {
/// let services = Services::new(pool, None);
///
/// let mine = services.shipments.get_by_user(1).await?;
/// for shipment in &mine {
///     println!("#{} {} via {}", shipment.id, shipment.status_label(), shipment.method_name());
/// }
///
/// services.shipments.update_status(mine[0].id, ShipmentStatus::InTransit).await?;
/// # Ok(())
/// # }
/// ```

pub mod method_service;
pub mod shipment_service;
pub mod user_service;

pub use method_service::ShippingMethodService;
pub use shipment_service::ShipmentService;
pub use user_service::UserService;

use sqlx::PgPool;

use crate::redis::feed_writer::FeedWriter;

/// All domain services over one pool
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub methods: ShippingMethodService,
    pub shipments: ShipmentService,
}

impl Services {
    /// Builds the services; `feed` enables change publishing for shipments
    pub fn new(pool: PgPool, feed: Option<FeedWriter>) -> Self {
        Self {
            users: UserService::new(pool.clone()),
            methods: ShippingMethodService::new(pool.clone()),
            shipments: ShipmentService::new(pool, feed),
        }
    }

    pub fn pool(&self) -> &PgPool {
        self.users.pool()
    }
}
