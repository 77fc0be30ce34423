/// Custom middleware for the API server
///
/// Session checks live in [`crate::app`] because they need the application
/// state.

pub mod security;
