//! Database models mapping to the marketplace schema.

use bazaar_core::{ApprovalRecord, ApprovalStatus};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{MetadataError, MetadataResult};

// =============================================================================
// Sellers
// =============================================================================

/// Seller account.
#[derive(Debug, Clone, FromRow)]
pub struct SellerRow {
    pub seller_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

// =============================================================================
// Products
// =============================================================================

/// Product listing with its approval columns.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub category: Option<String>,
    pub approval_status: String, // pending | under_review | approved | rejected
    pub is_active: bool,
    pub is_approved: bool,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<OffsetDateTime>,
    pub rejected_at: Option<OffsetDateTime>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ProductRow {
    /// Parsed approval status.
    pub fn status(&self) -> MetadataResult<ApprovalStatus> {
        ApprovalStatus::parse(&self.approval_status).map_err(|e| {
            MetadataError::Internal(format!("product {}: {e}", self.product_id))
        })
    }

    /// The approval columns as a domain record.
    pub fn approval_record(&self) -> MetadataResult<ApprovalRecord> {
        Ok(ApprovalRecord {
            approval_status: self.status()?,
            is_active: self.is_active,
            is_approved: self.is_approved,
            admin_notes: self.admin_notes.clone(),
            rejection_reason: self.rejection_reason.clone(),
            approved_at: self.approved_at,
            rejected_at: self.rejected_at,
            reviewed_by: self.reviewed_by,
            updated_at: self.updated_at,
        })
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// Token record.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRow {
    pub token_id: Uuid,
    pub seller_id: Option<Uuid>,
    pub token_hash: String,
    pub scopes: String, // JSON array
    pub expires_at: Option<OffsetDateTime>,
    pub revoked_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub last_used_at: Option<OffsetDateTime>,
    pub description: Option<String>,
}

// =============================================================================
// Notifications
// =============================================================================

/// Seller notification.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub notification_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Option<Uuid>,
    pub kind: String,
    pub message: String,
    pub created_at: OffsetDateTime,
    pub read_at: Option<OffsetDateTime>,
}

// =============================================================================
// Repair runs
// =============================================================================

/// One execution of the visibility repair sweeps.
#[derive(Debug, Clone, FromRow)]
pub struct RepairRunRow {
    pub run_id: Uuid,
    pub trigger_kind: String, // manual | scheduled | startup
    pub activated: i64,
    pub deactivated: i64,
    pub started_at: OffsetDateTime,
    pub finished_at: Option<OffsetDateTime>,
    pub triggered_by: Option<Uuid>,
    pub error: Option<String>,
}
