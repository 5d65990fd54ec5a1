//! Integration tests for cross-cutting HTTP API behavior.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bazaar_metadata::models::TokenRow;
use common::fixtures::sha256_hash;
use common::{TestServer, create_seller_token, create_test_token, json_request};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "GET", "/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("status").and_then(|v| v.as_str()), Some("ok"));
    assert!(body.get("version").is_some());
}

#[tokio::test]
async fn test_whoami_requires_token() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "GET", "/v1/auth/whoami", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "unauthorized");
    assert!(body["message"].as_str().unwrap().contains("authentication required"));
}

#[tokio::test]
async fn test_whoami_reports_role_per_scope() {
    let server = TestServer::new().await;
    let seller = server.create_seller("Whoami Goods").await;

    let cases = [
        (create_test_token(&server, r#"["catalog:read"]"#).await, "customer"),
        (create_seller_token(&server, seller.seller_id).await, "seller"),
        (create_test_token(&server, r#"["approval:admin"]"#).await, "admin"),
        (create_test_token(&server, r#"["platform:admin"]"#).await, "super_admin"),
    ];

    for (token, role) in cases {
        let (status, body) =
            json_request(&server.router, "GET", "/v1/auth/whoami", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], role, "unexpected role for {body}");
    }

    let token = create_seller_token(&server, seller.seller_id).await;
    let (_, body) = json_request(&server.router, "GET", "/v1/auth/whoami", None, Some(&token)).await;
    assert_eq!(body["seller_id"], seller.seller_id.to_string());
    assert_eq!(body["seller_name"], "Whoami Goods");
}

#[tokio::test]
async fn test_unknown_token_is_treated_as_anonymous() {
    let server = TestServer::new().await;

    // Public catalog still works
    let (status, _) = json_request(
        &server.router,
        "GET",
        "/v1/catalog/products",
        None,
        Some("not-a-real-token"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Authenticated endpoints reject it
    let (status, _) = json_request(
        &server.router,
        "GET",
        "/v1/admin/approvals",
        None,
        Some("not-a-real-token"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_and_revoked_tokens_are_rejected() {
    let server = TestServer::new().await;
    let now = OffsetDateTime::now_utc();

    for (expires_at, revoked_at) in [
        (Some(now - Duration::hours(1)), None),
        (None, Some(now - Duration::minutes(5))),
    ] {
        let raw = format!("stale-{}", Uuid::new_v4());
        let token = TokenRow {
            token_id: Uuid::new_v4(),
            seller_id: None,
            token_hash: sha256_hash(raw.as_bytes()),
            scopes: r#"["platform:admin"]"#.to_string(),
            expires_at,
            revoked_at,
            created_at: now - Duration::days(1),
            last_used_at: None,
            description: None,
        };
        server.metadata().create_token(&token).await.unwrap();

        let (status, body) =
            json_request(&server.router, "GET", "/v1/health", None, Some(&raw)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "unauthorized: token expired or revoked");
    }
}

#[tokio::test]
async fn test_bearer_scheme_is_case_insensitive() {
    let server = TestServer::new().await;
    let token = create_test_token(&server, r#"["approval:admin"]"#).await;

    let request = Request::builder()
        .method("GET")
        .uri("/v1/auth/whoami")
        .header("Authorization", format!("BEARER {token}"))
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_toggle() {
    bazaar_server::metrics::register_metrics();

    let server = TestServer::new().await;
    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("bazaar_repair_rows_activated_total"));

    let server = TestServer::with_config(|c| c.server.metrics_enabled = false).await;
    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let server = TestServer::new().await;
    let token = create_test_token(&server, r#"["platform:admin"]"#).await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/admin/sellers")
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
