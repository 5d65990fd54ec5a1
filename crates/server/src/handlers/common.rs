//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::Request;
use bazaar_metadata::models::ProductRow;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Maximum accepted JSON request body.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Read and parse a JSON request body.
pub async fn read_json<T: DeserializeOwned>(req: Request) -> ApiResult<T> {
    let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

/// Parse a UUID path segment.
pub fn parse_id(value: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| ApiError::BadRequest(format!("invalid {what}: {e}")))
}

/// Format a timestamp as RFC 3339.
pub fn format_time(ts: OffsetDateTime, field: &str) -> ApiResult<String> {
    ts.format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("failed to format {field}: {e}")))
}

/// Format an optional timestamp as RFC 3339.
pub fn format_opt_time(ts: Option<OffsetDateTime>, field: &str) -> ApiResult<Option<String>> {
    ts.map(|t| format_time(t, field)).transpose()
}

/// Resolve `limit` / `offset` query values against the server page size limits.
pub fn page(state: &AppState, limit: Option<u32>, offset: Option<u32>) -> (u32, u32) {
    (state.config.server.page_size(limit), offset.unwrap_or(0))
}

/// Product as returned to sellers and admins.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product_id: String,
    pub seller_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub category: Option<String>,
    pub approval_status: String,
    pub is_active: bool,
    pub is_approved: bool,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<String>,
    pub rejected_at: Option<String>,
    pub reviewed_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProductResponse {
    pub fn from_row(row: ProductRow) -> ApiResult<Self> {
        Ok(Self {
            product_id: row.product_id.to_string(),
            seller_id: row.seller_id.to_string(),
            approved_at: format_opt_time(row.approved_at, "approved_at")?,
            rejected_at: format_opt_time(row.rejected_at, "rejected_at")?,
            reviewed_by: row.reviewed_by.map(|id| id.to_string()),
            created_at: format_time(row.created_at, "created_at")?,
            updated_at: format_time(row.updated_at, "updated_at")?,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            stock_quantity: row.stock_quantity,
            category: row.category,
            approval_status: row.approval_status,
            is_active: row.is_active,
            is_approved: row.is_approved,
            admin_notes: row.admin_notes,
            rejection_reason: row.rejection_reason,
        })
    }
}

/// Convert a list of rows, failing on the first bad timestamp.
pub fn product_list(rows: Vec<ProductRow>) -> ApiResult<Vec<ProductResponse>> {
    rows.into_iter().map(ProductResponse::from_row).collect()
}
