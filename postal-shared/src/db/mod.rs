/// Database layer for Postal
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: schema migration runner
///
/// Table access goes through [`crate::store::Gateway`]; the domain services
/// in [`crate::services`] build on it.

pub mod migrations;
pub mod pool;
