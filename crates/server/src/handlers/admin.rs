//! Platform administration endpoints: health, sellers, tokens.

use crate::auth::{hash_token, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{format_opt_time, format_time, page, parse_id, read_json};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use bazaar_core::token::TokenScope;
use bazaar_metadata::models::{SellerRow, TokenRow};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /v1/health - Health check.
///
/// Unauthenticated so load balancers and orchestrator probes can call it.
/// Returns only non-sensitive information (status and version).
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.metadata.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// Sellers
// =============================================================================

/// Create seller request.
#[derive(Debug, Deserialize)]
pub struct CreateSellerRequest {
    pub display_name: String,
    pub email: String,
}

/// Seller account response.
#[derive(Debug, Serialize)]
pub struct SellerResponse {
    pub seller_id: String,
    pub display_name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl SellerResponse {
    fn from_row(row: SellerRow) -> ApiResult<Self> {
        Ok(Self {
            seller_id: row.seller_id.to_string(),
            created_at: format_time(row.created_at, "created_at")?,
            updated_at: format_time(row.updated_at, "updated_at")?,
            display_name: row.display_name,
            email: row.email,
            is_active: row.is_active,
        })
    }
}

/// Pagination query.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// POST /v1/admin/sellers - Create a seller account.
pub async fn create_seller(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<SellerResponse>)> {
    let auth = require_auth(&req)?;
    auth.require_scope(TokenScope::PlatformAdmin)?;

    let body: CreateSellerRequest = read_json(req).await?;
    let display_name = body.display_name.trim().to_string();
    let email = body.email.trim().to_lowercase();
    if display_name.is_empty() {
        return Err(ApiError::BadRequest("display_name is required".to_string()));
    }
    if !email.contains('@') {
        return Err(ApiError::BadRequest(format!("invalid email: {email}")));
    }

    let now = OffsetDateTime::now_utc();
    let seller = SellerRow {
        seller_id: Uuid::new_v4(),
        display_name,
        email,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state.metadata.create_seller(&seller).await?;
    tracing::info!(seller_id = %seller.seller_id, "Seller created");

    Ok((StatusCode::CREATED, Json(SellerResponse::from_row(seller)?)))
}

/// GET /v1/admin/sellers - List seller accounts.
pub async fn list_sellers(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    req: Request,
) -> ApiResult<Json<Vec<SellerResponse>>> {
    let auth = require_auth(&req)?;
    auth.require_scope(TokenScope::PlatformAdmin)?;

    let (limit, offset) = page(&state, query.limit, query.offset);
    let sellers = state.metadata.list_sellers(limit, offset).await?;
    let response = sellers
        .into_iter()
        .map(SellerResponse::from_row)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(response))
}

/// GET /v1/admin/sellers/{seller_id} - Get a seller account.
pub async fn get_seller(
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
    req: Request,
) -> ApiResult<Json<SellerResponse>> {
    let auth = require_auth(&req)?;
    auth.require_scope(TokenScope::PlatformAdmin)?;

    let seller_id = parse_id(&seller_id, "seller ID")?;
    let seller = state
        .metadata
        .get_seller(seller_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("seller".to_string()))?;
    Ok(Json(SellerResponse::from_row(seller)?))
}

// =============================================================================
// Tokens
// =============================================================================

/// Create token request.
#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub scopes: Vec<String>,
    pub seller_id: Option<String>,
    pub expires_in_secs: Option<u64>,
    pub description: Option<String>,
}

/// Create token response.
#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token_id: String,
    pub token_secret: String,
    pub expires_at: Option<String>,
}

/// Token listing response.
#[derive(Debug, Serialize)]
pub struct TokenInfo {
    pub token_id: String,
    pub seller_id: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<String>,
    pub revoked_at: Option<String>,
    pub created_at: String,
    pub last_used_at: Option<String>,
    pub description: Option<String>,
}

/// Token list filter.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub seller_id: Option<String>,
}

/// POST /v1/admin/tokens - Create a new token.
pub async fn create_token(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<CreateTokenResponse>)> {
    let auth = require_auth(&req)?;
    auth.require_scope(TokenScope::PlatformAdmin)?;
    let issuer = auth.token.id;

    let body: CreateTokenRequest = read_json(req).await?;

    if body.scopes.is_empty() {
        return Err(ApiError::BadRequest("at least one scope is required".to_string()));
    }
    // Reject unknown scopes before storing
    let mut scopes = Vec::with_capacity(body.scopes.len());
    for scope in &body.scopes {
        let parsed = TokenScope::parse(scope)
            .map_err(|_| ApiError::BadRequest(format!("invalid scope: {scope}")))?;
        scopes.push(parsed);
    }

    let seller_id = body
        .seller_id
        .as_deref()
        .map(|id| parse_id(id, "seller_id"))
        .transpose()?;

    let wants_seller = scopes.contains(&TokenScope::SellerWrite);
    let wants_admin = scopes
        .iter()
        .any(|s| matches!(s, TokenScope::ApprovalAdmin | TokenScope::PlatformAdmin));
    if wants_seller && seller_id.is_none() {
        return Err(ApiError::BadRequest(
            "seller:write scope requires seller_id".to_string(),
        ));
    }
    if wants_admin && seller_id.is_some() {
        return Err(ApiError::BadRequest(
            "admin scopes require a token without seller_id".to_string(),
        ));
    }

    // Prevent orphaned tokens
    if let Some(id) = seller_id
        && state.metadata.get_seller(id).await?.is_none()
    {
        return Err(ApiError::BadRequest(format!("seller not found: {id}")));
    }

    let token_secret = generate_token_secret();
    let now = OffsetDateTime::now_utc();
    let expires_at = match body.expires_in_secs {
        Some(secs) => {
            let secs_i64: i64 = secs.try_into().map_err(|_| {
                ApiError::BadRequest(format!(
                    "expires_in_secs too large: {secs} exceeds maximum of {}",
                    i64::MAX
                ))
            })?;
            Some(now + time::Duration::seconds(secs_i64))
        }
        None => None,
    };

    let scopes_json = serde_json::to_string(&body.scopes)
        .map_err(|e| ApiError::Internal(format!("failed to serialize scopes: {e}")))?;

    let token_row = TokenRow {
        token_id: Uuid::new_v4(),
        seller_id,
        token_hash: hash_token(&token_secret),
        scopes: scopes_json,
        expires_at,
        revoked_at: None,
        created_at: now,
        last_used_at: None,
        description: body.description,
    };
    state.metadata.create_token(&token_row).await?;
    tracing::info!(
        token_id = %token_row.token_id,
        issued_by = %issuer,
        seller_id = ?seller_id,
        "Token created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateTokenResponse {
            token_id: token_row.token_id.to_string(),
            token_secret,
            expires_at: format_opt_time(expires_at, "expires_at")?,
        }),
    ))
}

/// GET /v1/admin/tokens - List tokens, optionally for one seller.
pub async fn list_tokens(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    req: Request,
) -> ApiResult<Json<Vec<TokenInfo>>> {
    let auth = require_auth(&req)?;
    auth.require_scope(TokenScope::PlatformAdmin)?;

    let seller_filter = query
        .seller_id
        .as_deref()
        .map(|id| parse_id(id, "seller_id"))
        .transpose()?;

    let tokens = state.metadata.list_tokens(seller_filter).await?;
    let response: ApiResult<Vec<TokenInfo>> = tokens
        .into_iter()
        .map(|token| {
            let scopes: Vec<String> = serde_json::from_str(&token.scopes)
                .map_err(|e| ApiError::Internal(format!("invalid token scopes: {e}")))?;
            Ok(TokenInfo {
                token_id: token.token_id.to_string(),
                seller_id: token.seller_id.map(|id| id.to_string()),
                scopes,
                expires_at: format_opt_time(token.expires_at, "expires_at")?,
                revoked_at: format_opt_time(token.revoked_at, "revoked_at")?,
                created_at: format_time(token.created_at, "created_at")?,
                last_used_at: format_opt_time(token.last_used_at, "last_used_at")?,
                description: token.description,
            })
        })
        .collect();

    Ok(Json(response?))
}

/// DELETE /v1/admin/tokens/{token_id} - Revoke a token.
pub async fn revoke_token(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
    req: Request,
) -> ApiResult<StatusCode> {
    let auth = require_auth(&req)?;
    auth.require_scope(TokenScope::PlatformAdmin)?;

    let token_id = parse_id(&token_id, "token ID")?;
    if *auth.token.id.as_uuid() == token_id {
        return Err(ApiError::BadRequest(
            "cannot revoke the token used for this request".to_string(),
        ));
    }

    if !state
        .metadata
        .revoke_token(token_id, OffsetDateTime::now_utc())
        .await?
    {
        return Err(ApiError::NotFound("token".to_string()));
    }
    tracing::info!(token_id = %token_id, "Token revoked");

    Ok(StatusCode::NO_CONTENT)
}

/// Generate a random token secret using a cryptographically secure RNG.
fn generate_token_secret() -> String {
    use base64::Engine;
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
