//! Server test utilities.

use crate::common::fixtures::{pending_product, seller_row, sha256_hash};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bazaar_core::config::{AdminConfig, AppConfig, MetadataConfig};
use bazaar_metadata::models::{ProductRow, SellerRow, TokenRow};
use bazaar_metadata::{MetadataStore, SqliteStore};
use bazaar_server::{AppState, create_router};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server over a temporary SQLite database.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let db_path = temp_dir.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path, None)
                .await
                .expect("Failed to create metadata store"),
        );

        let mut config = AppConfig {
            metadata: MetadataConfig::Sqlite {
                path: db_path,
                query_timeout_secs: None,
            },
            admin: AdminConfig::for_testing(),
            ..AppConfig::for_testing()
        };

        modifier(&mut config);

        let state = AppState::new(config, metadata);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying metadata.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// Insert a seller directly.
    pub async fn create_seller(&self, display_name: &str) -> SellerRow {
        let seller = seller_row(display_name);
        self.metadata()
            .create_seller(&seller)
            .await
            .expect("Failed to create seller");
        seller
    }

    /// Insert a product directly, bypassing the seller API.
    pub async fn insert_product(&self, product: &ProductRow) {
        self.metadata()
            .create_product(product)
            .await
            .expect("Failed to create product");
    }

    /// Insert a pending product for a seller.
    pub async fn create_pending_product(&self, seller_id: Uuid, name: &str) -> ProductRow {
        let product = pending_product(seller_id, name);
        self.insert_product(&product).await;
        product
    }

    /// Load a product row.
    pub async fn product(&self, product_id: Uuid) -> ProductRow {
        self.metadata()
            .get_product(product_id)
            .await
            .expect("Failed to load product")
            .expect("product missing")
    }
}

/// Helper to make JSON requests.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = auth_token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Create a test token and return the raw token value.
#[allow(dead_code)]
pub async fn create_test_token(server: &TestServer, scopes: &str) -> String {
    create_token_row(server, scopes, None).await.0
}

/// Create a seller-bound `seller:write` token.
#[allow(dead_code)]
pub async fn create_seller_token(server: &TestServer, seller_id: Uuid) -> String {
    create_token_row(server, r#"["seller:write"]"#, Some(seller_id))
        .await
        .0
}

/// Create a token and return the raw value with its row.
#[allow(dead_code)]
pub async fn create_token_row(
    server: &TestServer,
    scopes: &str,
    seller_id: Option<Uuid>,
) -> (String, TokenRow) {
    let raw_token = format!("test-token-{}", Uuid::new_v4());
    let token = TokenRow {
        token_id: Uuid::new_v4(),
        seller_id,
        token_hash: sha256_hash(raw_token.as_bytes()),
        scopes: scopes.to_string(),
        expires_at: None,
        revoked_at: None,
        created_at: OffsetDateTime::now_utc(),
        last_used_at: None,
        description: Some("Test Token".to_string()),
    };

    server
        .metadata()
        .create_token(&token)
        .await
        .expect("Failed to create token");

    (raw_token, token)
}
