//! Authentication-related endpoints.

use crate::auth::require_auth;
use crate::error::ApiResult;
use crate::handlers::common::format_opt_time;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use serde::Serialize;

/// Response for the authenticated caller.
#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub token_id: String,
    pub role: String,
    pub seller_id: Option<String>,
    pub seller_name: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<String>,
}

/// GET /v1/auth/whoami - Return token identity, role, and seller context.
pub async fn whoami(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<WhoamiResponse>> {
    let auth = require_auth(&req)?;
    let token = &auth.token;

    let seller = match token.seller_id {
        Some(seller_id) => state.metadata.get_seller(seller_id).await?,
        None => None,
    };

    let mut scopes: Vec<String> = token
        .scopes
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();
    scopes.sort();

    Ok(Json(WhoamiResponse {
        token_id: token.id.to_string(),
        role: token.role().as_str().to_string(),
        seller_id: token.seller_id.map(|id| id.to_string()),
        seller_name: seller.map(|row| row.display_name),
        scopes,
        expires_at: format_opt_time(token.expires_at, "expires_at")?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use axum::body::Body;
    use bazaar_core::config::AppConfig;
    use bazaar_core::token::{Token, TokenId, TokenScope};
    use bazaar_metadata::models::SellerRow;
    use bazaar_metadata::{MetadataStore, SqliteStore};
    use std::collections::HashSet;
    use std::sync::Arc;
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_whoami_includes_seller_and_role() {
        let metadata_dir = tempfile::tempdir().unwrap();
        let db_path = metadata_dir.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> =
            Arc::new(SqliteStore::new(&db_path, None).await.unwrap());
        let state = AppState::new(AppConfig::for_testing(), metadata.clone());

        let now = OffsetDateTime::now_utc();
        let seller = SellerRow {
            seller_id: Uuid::new_v4(),
            display_name: "Acme Goods".to_string(),
            email: "hello@acme.test".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        metadata.create_seller(&seller).await.unwrap();

        let mut scopes = HashSet::new();
        scopes.insert(TokenScope::SellerWrite);
        scopes.insert(TokenScope::CatalogRead);
        let expires_at = now + time::Duration::seconds(3600);
        let token = Token {
            id: TokenId::new(),
            seller_id: Some(seller.seller_id),
            scopes,
            expires_at: Some(expires_at),
            revoked_at: None,
            created_at: now,
            description: None,
        };

        let mut req = Request::new(Body::empty());
        req.extensions_mut().insert(AuthenticatedUser {
            token: token.clone(),
        });

        let Json(response) = whoami(State(state), req).await.unwrap();

        assert_eq!(response.token_id, token.id.to_string());
        assert_eq!(response.role, "seller");
        assert_eq!(response.seller_id, Some(seller.seller_id.to_string()));
        assert_eq!(response.seller_name, Some("Acme Goods".to_string()));
        assert_eq!(
            response.scopes,
            vec!["catalog:read".to_string(), "seller:write".to_string()]
        );
        assert_eq!(
            response.expires_at,
            Some(expires_at.format(&Rfc3339).unwrap())
        );
    }
}
