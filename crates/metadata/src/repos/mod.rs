//! Repository traits for metadata operations.

pub mod approvals;
pub mod bootstrap;
pub mod notifications;
pub mod products;
pub mod sellers;
pub mod tokens;

pub use approvals::ApprovalRepo;
pub use bootstrap::BootstrapRepo;
pub use notifications::NotificationRepo;
pub use products::{ApprovalCounts, ProductFilter, ProductRepo};
pub use sellers::SellerRepo;
pub use tokens::TokenRepo;
