//! HTTP request handlers.

pub mod admin;
pub mod approvals;
pub mod auth;
pub mod catalog;
pub mod common;
pub mod repair;
pub mod seller;

pub use admin::*;
pub use approvals::*;
pub use auth::*;
pub use catalog::*;
pub use repair::*;
pub use seller::*;
