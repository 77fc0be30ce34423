//! # Postal Shared Library
//!
//! Storage, domain services, sessions and dashboard logic used by the
//! Postal API server.
//!
//! ## Module Organization
//!
//! - `store`: generic table gateway (CRUD by id, single-row lookups)
//! - `models`: users, shipping methods, shipments and login credentials
//! - `services`: per-table services built on the gateway
//! - `auth`: passwords, tokens, session resolution and accounts
//! - `dashboard`: admin and user page controllers
//! - `events`: shipment change events and the live listener
//! - `redis`: Redis client and stream reader/writer
//! - `db`: connection pool and migrations

pub mod auth;
pub mod dashboard;
pub mod db;
pub mod events;
pub mod models;
pub mod redis;
pub mod services;
pub mod store;

/// Current version of the Postal shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
