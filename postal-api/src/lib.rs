//! # Postal API Server Library
//!
//! HTTP surface of the shipment tracker: sign-up and login, the user and
//! admin dashboards, settings, and the live update feed.
//!
//! ## Modules
//!
//! - `app`: Application state, session layers and router builder
//! - `config`: Configuration from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
