//! Seller dashboard endpoints.
//!
//! Every endpoint requires `seller:write` on a token bound to a seller, and
//! only ever reads or writes that seller's rows.

use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{
    ProductResponse, format_opt_time, format_time, page, parse_id, product_list, read_json,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use bazaar_core::{ApprovalStatus, ProductDraft};
use bazaar_metadata::models::{NotificationRow, ProductRow};
use bazaar_metadata::repos::{ApprovalCounts, ProductFilter};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Default and maximum number of notifications returned.
const NOTIFICATION_LIMIT: u32 = 100;

/// Seller product listing query.
#[derive(Debug, Default, Deserialize)]
pub struct SellerProductQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// POST /v1/seller/products - Submit a new listing.
///
/// New listings start `pending` and hidden from the storefront.
pub async fn create_product(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<ProductResponse>)> {
    let seller_id = require_auth(&req)?.require_seller()?;
    let draft: ProductDraft = read_json(req).await?;
    let draft = draft.validated()?;

    let now = OffsetDateTime::now_utc();
    let product = ProductRow {
        product_id: Uuid::new_v4(),
        seller_id,
        name: draft.name,
        description: draft.description,
        price_cents: draft.price_cents,
        stock_quantity: draft.stock_quantity,
        category: draft.category,
        approval_status: ApprovalStatus::Pending.as_str().to_string(),
        is_active: false,
        is_approved: false,
        admin_notes: None,
        rejection_reason: None,
        approved_at: None,
        rejected_at: None,
        reviewed_by: None,
        created_at: now,
        updated_at: now,
    };
    state.metadata.create_product(&product).await?;
    tracing::info!(product_id = %product.product_id, seller_id = %seller_id, "Product submitted");

    Ok((StatusCode::CREATED, Json(ProductResponse::from_row(product)?)))
}

/// GET /v1/seller/products - The seller's own listings, any status.
pub async fn list_seller_products(
    State(state): State<AppState>,
    Query(query): Query<SellerProductQuery>,
    req: Request,
) -> ApiResult<Json<Vec<ProductResponse>>> {
    let seller_id = require_auth(&req)?.require_seller()?;

    let (limit, offset) = page(&state, query.limit, query.offset);
    let filter = ProductFilter {
        seller_id: Some(seller_id),
        status: query
            .status
            .as_deref()
            .map(ApprovalStatus::parse)
            .transpose()?,
        limit,
        offset,
        ..ProductFilter::default()
    };

    let rows = state.metadata.list_products(&filter).await?;
    Ok(Json(product_list(rows)?))
}

async fn load_own_product(state: &AppState, seller_id: Uuid, product_id: Uuid) -> ApiResult<ProductRow> {
    state
        .metadata
        .get_product(product_id)
        .await?
        // Another seller's product is reported as missing, not forbidden.
        .filter(|p| p.seller_id == seller_id)
        .ok_or_else(|| ApiError::NotFound("product".to_string()))
}

/// GET /v1/seller/products/{product_id}
pub async fn get_seller_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    req: Request,
) -> ApiResult<Json<ProductResponse>> {
    let seller_id = require_auth(&req)?.require_seller()?;
    let product_id = parse_id(&product_id, "product ID")?;
    let product = load_own_product(&state, seller_id, product_id).await?;
    Ok(Json(ProductResponse::from_row(product)?))
}

/// PUT /v1/seller/products/{product_id} - Replace the listing details.
///
/// Approval columns are untouched; an approved listing stays live.
pub async fn update_seller_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    req: Request,
) -> ApiResult<Json<ProductResponse>> {
    let seller_id = require_auth(&req)?.require_seller()?;
    let product_id = parse_id(&product_id, "product ID")?;
    let draft: ProductDraft = read_json(req).await?;
    let draft = draft.validated()?;

    let mut product = load_own_product(&state, seller_id, product_id).await?;
    product.name = draft.name;
    product.description = draft.description;
    product.price_cents = draft.price_cents;
    product.stock_quantity = draft.stock_quantity;
    product.category = draft.category;

    let updated = state
        .metadata
        .update_product_details(seller_id, &product, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| ApiError::NotFound("product".to_string()))?;

    Ok(Json(ProductResponse::from_row(updated)?))
}

/// DELETE /v1/seller/products/{product_id}
pub async fn delete_seller_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    req: Request,
) -> ApiResult<StatusCode> {
    let seller_id = require_auth(&req)?.require_seller()?;
    let product_id = parse_id(&product_id, "product ID")?;

    if !state.metadata.delete_product(seller_id, product_id).await? {
        return Err(ApiError::NotFound("product".to_string()));
    }
    tracing::info!(product_id = %product_id, seller_id = %seller_id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Seller dashboard counters.
#[derive(Debug, Serialize)]
pub struct SellerStatsResponse {
    #[serde(flatten)]
    pub counts: ApprovalCounts,
    pub total: u64,
}

/// GET /v1/seller/stats - Own listings per approval status.
pub async fn seller_stats(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<SellerStatsResponse>> {
    let seller_id = require_auth(&req)?.require_seller()?;
    let counts = state
        .metadata
        .count_products_by_status(Some(seller_id))
        .await?;
    Ok(Json(SellerStatsResponse {
        total: counts.total(),
        counts,
    }))
}

/// Notification listing query.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<u32>,
}

/// Notification response.
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub notification_id: String,
    pub product_id: Option<String>,
    pub kind: String,
    pub message: String,
    pub created_at: String,
    pub read_at: Option<String>,
}

impl NotificationResponse {
    fn from_row(row: NotificationRow) -> ApiResult<Self> {
        Ok(Self {
            notification_id: row.notification_id.to_string(),
            product_id: row.product_id.map(|id| id.to_string()),
            created_at: format_time(row.created_at, "created_at")?,
            read_at: format_opt_time(row.read_at, "read_at")?,
            kind: row.kind,
            message: row.message,
        })
    }
}

/// GET /v1/seller/notifications - Newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
    req: Request,
) -> ApiResult<Json<Vec<NotificationResponse>>> {
    let seller_id = require_auth(&req)?.require_seller()?;
    let limit = query
        .limit
        .unwrap_or(NOTIFICATION_LIMIT)
        .clamp(1, NOTIFICATION_LIMIT);

    let rows = state
        .metadata
        .list_notifications(seller_id, query.unread, limit)
        .await?;
    let response = rows
        .into_iter()
        .map(NotificationResponse::from_row)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(response))
}

/// POST /v1/seller/notifications/{notification_id}/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
    req: Request,
) -> ApiResult<StatusCode> {
    let seller_id = require_auth(&req)?.require_seller()?;
    let notification_id = parse_id(&notification_id, "notification ID")?;

    if !state
        .metadata
        .mark_notification_read(seller_id, notification_id, OffsetDateTime::now_utc())
        .await?
    {
        return Err(ApiError::NotFound("notification".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
