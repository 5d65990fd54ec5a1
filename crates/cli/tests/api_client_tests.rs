#[path = "../src/api_client.rs"]
#[allow(dead_code)] // Some methods are used by the binary but not by tests
mod api_client;

use api_client::{ApiClient, CreateSellerRequest, CreateTokenRequest, UpdateApprovalRequest};
use httpmock::Method::{DELETE, GET, POST, PUT};
use httpmock::MockServer;
use serde_json::json;
use std::net::TcpListener;

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn product_json(product_id: &str, status: &str, visible: bool) -> serde_json::Value {
    json!({
        "product_id": product_id,
        "seller_id": "00000000-0000-0000-0000-0000000000aa",
        "name": "Walnut Bowl",
        "description": null,
        "price_cents": 4500,
        "stock_quantity": 3,
        "category": "kitchen",
        "approval_status": status,
        "is_active": visible,
        "is_approved": visible,
        "admin_notes": null,
        "rejection_reason": null,
        "approved_at": null,
        "rejected_at": null,
        "reviewed_by": null,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn api_client_approval_paths() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let token = "secret-token";
    let product_id = "00000000-0000-0000-0000-000000000001";

    let queue = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/admin/approvals")
            .query_param("status", "pending")
            .query_param("limit", "10")
            .header("authorization", format!("Bearer {token}"));
        then.status(200)
            .json_body(json!([product_json(product_id, "pending", false)]));
    });

    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/admin/approvals/stats")
            .header("authorization", format!("Bearer {token}"));
        then.status(200).json_body(json!({
            "pending": 1,
            "under_review": 0,
            "approved": 2,
            "rejected": 0,
            "total": 3
        }));
    });

    let approve = server.mock(|when, then| {
        when.method(PUT)
            .path(format!("/v1/admin/products/{product_id}/approval"))
            .header("authorization", format!("Bearer {token}"))
            .json_body(json!({ "approval_status": "approved", "admin_notes": "looks good" }));
        then.status(200).json_body(json!({
            "success": true,
            "message": "Product status updated to approved",
            "notified": true,
            "product": product_json(product_id, "approved", true)
        }));
    });

    let client = ApiClient::new(&server.base_url(), token).unwrap();

    let products = client
        .list_approval_queue(Some("pending"), None, Some(10))
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].approval_status, "pending");
    queue.assert();

    let stats = client.approval_stats().await.unwrap();
    assert_eq!(stats.approved, 2);
    assert_eq!(stats.total, 3);

    let response = client
        .update_approval(
            product_id,
            UpdateApprovalRequest {
                approval_status: "approved".to_string(),
                rejection_reason: None,
                admin_notes: Some("looks good".to_string()),
            },
        )
        .await
        .unwrap();
    approve.assert();
    assert!(response.success);
    assert!(response.notified);
    assert!(response.product.is_active && response.product.is_approved);
}

#[tokio::test]
async fn api_client_repair_paths() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let token = "secret-token";
    let run = json!({
        "run_id": "00000000-0000-0000-0000-000000000002",
        "trigger": "manual",
        "activated": 2,
        "deactivated": 1,
        "started_at": "2024-01-01T00:00:00Z",
        "finished_at": "2024-01-01T00:00:01Z",
        "triggered_by": null,
        "error": null
    });

    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/admin/repair")
            .header("authorization", format!("Bearer {token}"));
        then.status(200).json_body(json!({
            "success": true,
            "message": "Activated 2 and deactivated 1 products",
            "run": run.clone()
        }));
    });

    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/admin/repair/runs")
            .query_param("limit", "5")
            .header("authorization", format!("Bearer {token}"));
        then.status(200).json_body(json!([run.clone()]));
    });

    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/admin/repair/report")
            .header("authorization", format!("Bearer {token}"));
        then.status(200).json_body(json!({
            "total": 1,
            "repairable": 0,
            "by_drift": { "pending_visible": 1 },
            "products": [{
                "product_id": "00000000-0000-0000-0000-000000000003",
                "seller_id": "00000000-0000-0000-0000-0000000000aa",
                "name": "Lamp",
                "approval_status": "pending",
                "is_active": true,
                "is_approved": true,
                "drift": "pending_visible",
                "repaired_by": null
            }]
        }));
    });

    let client = ApiClient::new(&server.base_url(), token).unwrap();

    let response = client.run_repair().await.unwrap();
    assert_eq!(response.run.activated, 2);
    assert_eq!(response.run.deactivated, 1);

    let runs = client.list_repair_runs(Some(5)).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].trigger, "manual");

    let report = client.drift_report(None).await.unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.by_drift.get("pending_visible"), Some(&1));
    assert!(report.products[0].repaired_by.is_none());
}

#[tokio::test]
async fn api_client_admin_paths() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let token = "secret-token";
    let seller_id = "00000000-0000-0000-0000-0000000000aa";
    let token_id = "00000000-0000-0000-0000-000000000004";
    let seller = json!({
        "seller_id": seller_id,
        "display_name": "Pottery Co",
        "email": "hello@pottery.test",
        "is_active": true,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    });

    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/admin/sellers")
            .header("authorization", format!("Bearer {token}"));
        then.status(201).json_body(seller.clone());
    });

    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/admin/sellers")
            .header("authorization", format!("Bearer {token}"));
        then.status(200).json_body(json!([seller.clone()]));
    });

    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/admin/tokens")
            .header("authorization", format!("Bearer {token}"))
            .json_body_partial(r#"{ "scopes": ["seller:write"] }"#);
        then.status(201).json_body(json!({
            "token_id": token_id,
            "token_secret": "token-secret",
            "expires_at": null
        }));
    });

    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/admin/tokens")
            .query_param("seller_id", seller_id)
            .header("authorization", format!("Bearer {token}"));
        then.status(200).json_body(json!([{
            "token_id": token_id,
            "seller_id": seller_id,
            "scopes": ["seller:write"],
            "expires_at": null,
            "revoked_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "last_used_at": null,
            "description": null
        }]));
    });

    let revoke = server.mock(|when, then| {
        when.method(DELETE)
            .path(format!("/v1/admin/tokens/{token_id}"))
            .header("authorization", format!("Bearer {token}"));
        then.status(204);
    });

    let client = ApiClient::new(&server.base_url(), token).unwrap();

    let created = client
        .create_seller(CreateSellerRequest {
            display_name: "Pottery Co".to_string(),
            email: "hello@pottery.test".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(created.seller_id, seller_id);
    assert_eq!(client.list_sellers().await.unwrap().len(), 1);

    let created_token = client
        .create_token(CreateTokenRequest {
            scopes: vec!["seller:write".to_string()],
            seller_id: Some(seller_id.to_string()),
            expires_in_secs: None,
            description: None,
        })
        .await
        .unwrap();
    assert_eq!(created_token.token_id, token_id);

    let tokens = client.list_tokens(Some(seller_id)).await.unwrap();
    assert_eq!(tokens[0].seller_id.as_deref(), Some(seller_id));

    client.revoke_token(token_id).await.unwrap();
    revoke.assert();
}

#[tokio::test]
async fn api_client_surfaces_structured_errors() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let token = "secret-token";

    server.mock(|when, then| {
        when.method(GET).path("/v1/admin/products/missing");
        then.status(404).json_body(json!({
            "success": false,
            "code": "not_found",
            "message": "not found: product missing",
            "error": "product missing"
        }));
    });

    server.mock(|when, then| {
        when.method(GET).path("/v1/admin/sellers/bad");
        then.status(500).body("boom");
    });

    let client = ApiClient::new(&server.base_url(), token).unwrap();

    let err = client.get_product("missing").await.unwrap_err().to_string();
    assert!(err.contains("API error (404"), "{err}");
    assert!(err.contains("not found: product missing (not_found)"), "{err}");

    let err = client.get_seller("bad").await.unwrap_err().to_string();
    assert!(err.contains("API error (500"), "{err}");
    assert!(err.contains("boom"), "{err}");
}
