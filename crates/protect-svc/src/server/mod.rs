//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Map the field cipher and document vault onto HTTP routes.
//! - Translate library errors into status codes with caller-safe messages.
//! - Inject shared application state (`AppState`) into handlers.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
