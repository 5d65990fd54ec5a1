//! HTTP API server for the Bazaar marketplace.
//!
//! This crate provides the HTTP control plane:
//! - Public storefront catalog
//! - Seller listing management and notifications
//! - Admin approval decisions
//! - Visibility repair sweeps (manual, scheduled, startup)
//! - Admin endpoints (sellers, tokens)

pub mod approval;
pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod repair;
pub mod routes;
pub mod state;

pub use auth::TraceId;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
