//! Authentication and authorization middleware.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use bazaar_core::token::{Token, TokenId, TokenScope};
use bazaar_metadata::models::TokenRow;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use time::OffsetDateTime;
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value.
    /// The value is truncated to MAX_TRACE_ID_LEN characters and non-printable characters removed.
    pub fn from_client(value: &str) -> Self {
        // Limit by character count, not byte count, to stay on UTF-8 boundaries.
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    /// Get the trace ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated request extension.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    /// The validated token.
    pub token: Token,
}

impl AuthenticatedUser {
    /// Check if the user has a specific scope.
    pub fn has_scope(&self, scope: TokenScope) -> bool {
        self.token.has_scope(scope)
    }

    /// Require a specific scope, returning an error if not present.
    pub fn require_scope(&self, scope: TokenScope) -> ApiResult<()> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "missing required scope: {}",
                scope
            )))
        }
    }

    /// Require `seller:write` on a token bound to a seller, returning that seller.
    pub fn require_seller(&self) -> ApiResult<Uuid> {
        self.require_scope(TokenScope::SellerWrite)?;
        self.token.seller_id.ok_or_else(|| {
            ApiError::Forbidden("token is not bound to a seller account".to_string())
        })
    }

    /// Reviewer identity recorded on approval decisions.
    pub fn reviewer_id(&self) -> Uuid {
        *self.token.id.as_uuid()
    }
}

/// Extract bearer token from Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(&v[7..])
            } else {
                None
            }
        })
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Hash a token secret for storage lookup (lowercase hex SHA-256).
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

/// Build a domain token from its stored row.
///
/// Unknown scopes are dropped with a warning so an old token with a retired
/// scope still authenticates for the scopes it has left.
pub fn token_from_row(row: &TokenRow) -> ApiResult<Token> {
    let scopes: Vec<String> = serde_json::from_str(&row.scopes)
        .map_err(|e| ApiError::Internal(format!("invalid token scopes: {e}")))?;

    let scopes: HashSet<TokenScope> = scopes
        .iter()
        .filter_map(|s| match TokenScope::parse(s) {
            Ok(scope) => Some(scope),
            Err(_) => {
                tracing::warn!(
                    token_id = %row.token_id,
                    invalid_scope = %s,
                    "Token contains invalid scope, ignoring"
                );
                None
            }
        })
        .collect();

    Ok(Token {
        id: TokenId::from(row.token_id),
        seller_id: row.seller_id,
        scopes,
        expires_at: row.expires_at,
        revoked_at: row.revoked_at,
        created_at: row.created_at,
        description: row.description.clone(),
    })
}

/// Authentication middleware that validates tokens and sets up trace context.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let trace_id = extract_or_generate_trace_id(&req);
    let trace_id_str = trace_id.0.clone();

    req.extensions_mut().insert(trace_id);

    if let Some(token_str) = extract_bearer_token(&req) {
        let token_hash = hash_token(token_str);

        // Unknown tokens fall through unauthenticated; handlers that need a
        // caller reject them via `require_auth`.
        if let Some(token_row) = state.metadata.get_token_by_hash(&token_hash).await? {
            let token = token_from_row(&token_row)?;
            if !token.is_valid() {
                return Err(ApiError::Unauthorized(
                    "token expired or revoked".to_string(),
                ));
            }

            // Update last used time (fire and forget)
            let metadata = state.metadata.clone();
            let token_id = token_row.token_id;
            tokio::spawn(async move {
                if let Err(e) = metadata
                    .touch_token(token_id, OffsetDateTime::now_utc())
                    .await
                {
                    tracing::debug!(token_id = %token_id, error = %e, "Failed to touch token");
                }
            });

            req.extensions_mut().insert(AuthenticatedUser { token });
        }
    }

    let response = next
        .run(req)
        .instrument(tracing::info_span!("request", trace_id = %trace_id_str))
        .await;

    Ok(response)
}

/// Require authentication (token must be present).
pub fn require_auth(req: &Request) -> ApiResult<&AuthenticatedUser> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
}

// Note: hex is a simple utility, we'll inline it
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}
