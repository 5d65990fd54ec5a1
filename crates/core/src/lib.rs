//! Core domain types and shared logic for the Bazaar marketplace.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Product approval status and the status-to-field patch mapping
//! - Consistency classification for drifted visibility flags
//! - Product listing validation
//! - Token scopes, roles, and authorization
//! - Seller notifications emitted by approval decisions

pub mod approval;
pub mod config;
pub mod consistency;
pub mod error;
pub mod notification;
pub mod product;
pub mod token;

pub use approval::{ApprovalDecision, ApprovalPatch, ApprovalRecord, ApprovalStatus};
pub use consistency::{Drift, RepairStats, RepairSweep};
pub use error::{Error, Result};
pub use notification::NotificationKind;
pub use product::ProductDraft;
pub use token::{Role, Token, TokenId, TokenScope};

/// Default page size for listing endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Maximum page size for listing endpoints.
pub const MAX_PAGE_SIZE: u32 = 200;
