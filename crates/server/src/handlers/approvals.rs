//! Admin approval console endpoints.

use crate::approval::{apply_decision, parse_decision};
use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{ProductResponse, page, parse_id, product_list, read_json};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, Request, State};
use bazaar_core::token::TokenScope;
use bazaar_core::ApprovalStatus;
use bazaar_metadata::repos::{ApprovalCounts, ProductFilter};
use serde::{Deserialize, Serialize};

/// Review queue query. `status` defaults to `pending`.
#[derive(Debug, Default, Deserialize)]
pub struct ApprovalQueueQuery {
    pub status: Option<String>,
    pub seller_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// GET /v1/admin/approvals - Products awaiting a decision.
pub async fn list_approval_queue(
    State(state): State<AppState>,
    Query(query): Query<ApprovalQueueQuery>,
    req: Request,
) -> ApiResult<Json<Vec<ProductResponse>>> {
    require_auth(&req)?.require_scope(TokenScope::ApprovalAdmin)?;

    let status = match query.status.as_deref() {
        None => ApprovalStatus::Pending,
        Some(s) => ApprovalStatus::parse(s)?,
    };
    let (limit, offset) = page(&state, query.limit, query.offset);
    let filter = ProductFilter {
        seller_id: query
            .seller_id
            .as_deref()
            .map(|id| parse_id(id, "seller_id"))
            .transpose()?,
        status: Some(status),
        limit,
        offset,
        ..ProductFilter::default()
    };

    let rows = state.metadata.list_products(&filter).await?;
    Ok(Json(product_list(rows)?))
}

/// Per-status counts for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct ApprovalStatsResponse {
    #[serde(flatten)]
    pub counts: ApprovalCounts,
    pub total: u64,
}

/// GET /v1/admin/approvals/stats
pub async fn approval_stats(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<ApprovalStatsResponse>> {
    require_auth(&req)?.require_scope(TokenScope::ApprovalAdmin)?;

    let counts = state.metadata.count_products_by_status(None).await?;
    Ok(Json(ApprovalStatsResponse {
        total: counts.total(),
        counts,
    }))
}

/// GET /v1/admin/products/{product_id} - Full record, any status.
pub async fn get_admin_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    req: Request,
) -> ApiResult<Json<ProductResponse>> {
    require_auth(&req)?.require_scope(TokenScope::ApprovalAdmin)?;

    let product_id = parse_id(&product_id, "product ID")?;
    let product = state
        .metadata
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product".to_string()))?;
    Ok(Json(ProductResponse::from_row(product)?))
}

/// Approval decision request.
#[derive(Debug, Deserialize)]
pub struct UpdateApprovalRequest {
    pub approval_status: String,
    pub rejection_reason: Option<String>,
    pub admin_notes: Option<String>,
}

/// Approval decision response.
#[derive(Debug, Serialize)]
pub struct UpdateApprovalResponse {
    pub success: bool,
    pub message: String,
    pub notified: bool,
    pub product: ProductResponse,
}

/// PUT /v1/admin/products/{product_id}/approval - Apply a decision.
pub async fn update_approval(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    req: Request,
) -> ApiResult<Json<UpdateApprovalResponse>> {
    let auth = require_auth(&req)?;
    auth.require_scope(TokenScope::ApprovalAdmin)?;
    let reviewer = auth.reviewer_id();

    let product_id = parse_id(&product_id, "product ID")?;
    let body: UpdateApprovalRequest = read_json(req).await?;

    let decision = parse_decision(
        product_id,
        &body.approval_status,
        non_blank(body.rejection_reason),
        non_blank(body.admin_notes),
    )?;

    let outcome = apply_decision(&state, product_id, &decision, Some(reviewer)).await?;
    let message = outcome.message();

    Ok(Json(UpdateApprovalResponse {
        success: true,
        message,
        notified: outcome.notified,
        product: ProductResponse::from_row(outcome.product)?,
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
