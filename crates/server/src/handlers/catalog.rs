//! Public storefront endpoints.
//!
//! Only products with both `is_active` and `is_approved` set are listed.

use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{format_time, page, parse_id};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, Request, State};
use bazaar_core::token::TokenScope;
use bazaar_metadata::models::ProductRow;
use bazaar_metadata::repos::ProductFilter;
use serde::{Deserialize, Serialize};

/// Storefront listing query.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Product as shown to customers. Approval metadata is omitted.
#[derive(Debug, Serialize)]
pub struct CatalogProduct {
    pub product_id: String,
    pub seller_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub category: Option<String>,
    pub listed_at: String,
}

impl CatalogProduct {
    fn from_row(row: ProductRow) -> ApiResult<Self> {
        let listed_at = row.approved_at.unwrap_or(row.created_at);
        Ok(Self {
            product_id: row.product_id.to_string(),
            seller_id: row.seller_id.to_string(),
            listed_at: format_time(listed_at, "listed_at")?,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            stock_quantity: row.stock_quantity,
            category: row.category,
        })
    }
}

/// Storefront listing response.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub products: Vec<CatalogProduct>,
    pub limit: u32,
    pub offset: u32,
}

fn check_catalog_access(state: &AppState, req: &Request) -> ApiResult<()> {
    if state.config.server.public_catalog {
        return Ok(());
    }
    require_auth(req)?.require_scope(TokenScope::CatalogRead)
}

/// GET /v1/catalog/products - Publicly visible products.
pub async fn list_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
    req: Request,
) -> ApiResult<Json<CatalogResponse>> {
    check_catalog_access(&state, &req)?;

    let (limit, offset) = page(&state, query.limit, query.offset);
    let mut filter = ProductFilter::storefront(limit, offset);
    filter.category = query.category.filter(|c| !c.trim().is_empty());

    let rows = state.metadata.list_products(&filter).await?;
    let products = rows
        .into_iter()
        .map(CatalogProduct::from_row)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(CatalogResponse {
        products,
        limit,
        offset,
    }))
}

/// GET /v1/catalog/products/{product_id} - One visible product.
///
/// Hidden products are reported as not found.
pub async fn get_catalog_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    req: Request,
) -> ApiResult<Json<CatalogProduct>> {
    check_catalog_access(&state, &req)?;

    let product_id = parse_id(&product_id, "product ID")?;
    let product = state
        .metadata
        .get_product(product_id)
        .await?
        .filter(|p| p.is_active && p.is_approved)
        .ok_or_else(|| ApiError::NotFound("product".to_string()))?;

    Ok(Json(CatalogProduct::from_row(product)?))
}
