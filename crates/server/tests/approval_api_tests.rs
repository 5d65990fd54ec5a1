//! Integration tests for admin approval decisions.

mod common;

use axum::http::StatusCode;
use common::fixtures::product_row;
use common::{TestServer, create_seller_token, create_test_token, create_token_row, json_request};
use serde_json::json;
use uuid::Uuid;

const ADMIN_SCOPES: &str = r#"["approval:admin"]"#;

fn approval_uri(product_id: Uuid) -> String {
    format!("/v1/admin/products/{product_id}/approval")
}

#[tokio::test]
async fn test_approve_sets_both_flags_and_audit_fields() {
    let server = TestServer::new().await;
    let seller = server.create_seller("Approve Co").await;
    let product = server.create_pending_product(seller.seller_id, "Desk").await;
    let (token, token_row) = create_token_row(&server, ADMIN_SCOPES, None).await;

    let (status, body) = json_request(
        &server.router,
        "PUT",
        &approval_uri(product.product_id),
        Some(json!({ "approval_status": "approved", "admin_notes": "looks good" })),
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Product status updated to approved");
    assert_eq!(body["product"]["approval_status"], "approved");
    assert_eq!(body["product"]["is_active"], true);
    assert_eq!(body["product"]["is_approved"], true);
    assert_eq!(body["product"]["admin_notes"], "looks good");
    assert_eq!(body["product"]["reviewed_by"], token_row.token_id.to_string());
    assert!(body["product"]["approved_at"].is_string());
    assert!(body["product"]["rejected_at"].is_null());

    let stored = server.product(product.product_id).await;
    assert!(stored.is_active && stored.is_approved);
    assert!(stored.updated_at >= product.updated_at);
}

#[tokio::test]
async fn test_reject_clears_flags_and_records_reason() {
    let server = TestServer::new().await;
    let seller = server.create_seller("Reject Co").await;
    let product = server.create_pending_product(seller.seller_id, "Chair").await;
    let token = create_test_token(&server, ADMIN_SCOPES).await;

    let (status, body) = json_request(
        &server.router,
        "PUT",
        &approval_uri(product.product_id),
        Some(json!({ "approval_status": "rejected", "rejection_reason": "blurry photos" })),
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["product"]["is_active"], false);
    assert_eq!(body["product"]["is_approved"], false);
    assert_eq!(body["product"]["rejection_reason"], "blurry photos");
    assert!(body["product"]["rejected_at"].is_string());
    assert!(body["product"]["approved_at"].is_null());
}

#[tokio::test]
async fn test_under_review_hides_a_live_product() {
    let server = TestServer::new().await;
    let seller = server.create_seller("Review Co").await;
    let product = product_row(seller.seller_id, "Lamp", "approved", true, true);
    server.insert_product(&product).await;
    let token = create_test_token(&server, ADMIN_SCOPES).await;

    let (status, body) = json_request(
        &server.router,
        "PUT",
        &approval_uri(product.product_id),
        Some(json!({ "approval_status": "under_review" })),
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let stored = server.product(product.product_id).await;
    assert_eq!(stored.approval_status, "under_review");
    assert!(!stored.is_active);
    assert!(!stored.is_approved);
}

#[tokio::test]
async fn test_pending_leaves_flags_unchanged() {
    let server = TestServer::new().await;
    let seller = server.create_seller("Pending Co").await;
    let live = product_row(seller.seller_id, "Rug", "approved", true, true);
    let hidden = product_row(seller.seller_id, "Mat", "rejected", false, false);
    server.insert_product(&live).await;
    server.insert_product(&hidden).await;
    let token = create_test_token(&server, ADMIN_SCOPES).await;

    for product in [&live, &hidden] {
        let (status, _) = json_request(
            &server.router,
            "PUT",
            &approval_uri(product.product_id),
            Some(json!({ "approval_status": "pending" })),
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let stored = server.product(product.product_id).await;
        assert_eq!(stored.approval_status, "pending");
        assert_eq!(stored.is_active, product.is_active);
        assert_eq!(stored.is_approved, product.is_approved);
    }
}

#[tokio::test]
async fn test_approve_then_reject_keeps_approved_at() {
    let server = TestServer::new().await;
    let seller = server.create_seller("Round Trip Co").await;
    let product = server.create_pending_product(seller.seller_id, "Vase").await;
    let token = create_test_token(&server, ADMIN_SCOPES).await;

    let (_, approved) = json_request(
        &server.router,
        "PUT",
        &approval_uri(product.product_id),
        Some(json!({ "approval_status": "approved" })),
        Some(&token),
    )
    .await;
    let approved_at = approved["product"]["approved_at"].clone();
    assert!(approved_at.is_string());

    let (status, rejected) = json_request(
        &server.router,
        "PUT",
        &approval_uri(product.product_id),
        Some(json!({ "approval_status": "rejected", "rejection_reason": "recalled" })),
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["product"]["is_active"], false);
    assert_eq!(rejected["product"]["is_approved"], false);
    assert_eq!(rejected["product"]["approved_at"], approved_at);
    assert!(rejected["product"]["rejected_at"].is_string());
}

#[tokio::test]
async fn test_unknown_status_is_rejected() {
    let server = TestServer::new().await;
    let seller = server.create_seller("Bad Status Co").await;
    let product = server.create_pending_product(seller.seller_id, "Pot").await;
    let token = create_test_token(&server, ADMIN_SCOPES).await;

    let (status, body) = json_request(
        &server.router,
        "PUT",
        &approval_uri(product.product_id),
        Some(json!({ "approval_status": "archived" })),
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "core_error");
    assert_eq!(body["error"], "invalid approval status: archived");
    assert_eq!(server.product(product.product_id).await.approval_status, "pending");
}

#[tokio::test]
async fn test_missing_product_returns_structured_failure() {
    let server = TestServer::new().await;
    let token = create_test_token(&server, ADMIN_SCOPES).await;
    let missing = Uuid::new_v4();

    let (status, body) = json_request(
        &server.router,
        "PUT",
        &approval_uri(missing),
        Some(json!({ "approval_status": "approved" })),
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "not_found");
    assert_eq!(body["message"], format!("not found: product {missing}"));
    assert_eq!(body["error"], format!("product {missing}"));
}

#[tokio::test]
async fn test_approval_requires_admin_scope() {
    let server = TestServer::new().await;
    let seller = server.create_seller("Scope Co").await;
    let product = server.create_pending_product(seller.seller_id, "Shelf").await;
    let seller_token = create_seller_token(&server, seller.seller_id).await;
    let customer_token = create_test_token(&server, r#"["catalog:read"]"#).await;
    let platform_token = create_test_token(&server, r#"["platform:admin"]"#).await;

    for token in [&seller_token, &customer_token] {
        let (status, _) = json_request(
            &server.router,
            "PUT",
            &approval_uri(product.product_id),
            Some(json!({ "approval_status": "approved" })),
            Some(token),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // platform:admin implies approval:admin
    let (status, _) = json_request(
        &server.router,
        "PUT",
        &approval_uri(product.product_id),
        Some(json!({ "approval_status": "approved" })),
        Some(&platform_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rejection_reason_required_when_configured() {
    let server = TestServer::with_config(|c| c.approval.require_rejection_reason = true).await;
    let seller = server.create_seller("Strict Co").await;
    let product = server.create_pending_product(seller.seller_id, "Clock").await;
    let token = create_test_token(&server, ADMIN_SCOPES).await;

    let (status, body) = json_request(
        &server.router,
        "PUT",
        &approval_uri(product.product_id),
        Some(json!({ "approval_status": "rejected", "rejection_reason": "   " })),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("rejection_reason"));

    let (status, _) = json_request(
        &server.router,
        "PUT",
        &approval_uri(product.product_id),
        Some(json!({ "approval_status": "rejected", "rejection_reason": "counterfeit" })),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_decision_notifies_seller() {
    let server = TestServer::new().await;
    let seller = server.create_seller("Notify Co").await;
    let product = server.create_pending_product(seller.seller_id, "Mirror").await;
    let admin = create_test_token(&server, ADMIN_SCOPES).await;
    let seller_token = create_seller_token(&server, seller.seller_id).await;

    let (_, body) = json_request(
        &server.router,
        "PUT",
        &approval_uri(product.product_id),
        Some(json!({ "approval_status": "rejected", "rejection_reason": "wrong category" })),
        Some(&admin),
    )
    .await;
    assert_eq!(body["notified"], true);

    let (status, notes) = json_request(
        &server.router,
        "GET",
        "/v1/seller/notifications?unread=true",
        None,
        Some(&seller_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let notes = notes.as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["kind"], "product_rejected");
    assert_eq!(notes[0]["product_id"], product.product_id.to_string());
    assert!(notes[0]["message"].as_str().unwrap().contains("wrong category"));
}

#[tokio::test]
async fn test_review_queue_and_stats() {
    let server = TestServer::new().await;
    let seller = server.create_seller("Queue Co").await;
    server.create_pending_product(seller.seller_id, "A").await;
    server.create_pending_product(seller.seller_id, "B").await;
    server
        .insert_product(&product_row(seller.seller_id, "C", "approved", true, true))
        .await;
    server
        .insert_product(&product_row(seller.seller_id, "D", "under_review", false, false))
        .await;
    let token = create_test_token(&server, ADMIN_SCOPES).await;

    let (status, queue) =
        json_request(&server.router, "GET", "/v1/admin/approvals", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let queue = queue.as_array().unwrap();
    assert_eq!(queue.len(), 2);
    assert!(queue.iter().all(|p| p["approval_status"] == "pending"));

    let (_, reviewing) = json_request(
        &server.router,
        "GET",
        "/v1/admin/approvals?status=under_review",
        None,
        Some(&token),
    )
    .await;
    assert_eq!(reviewing.as_array().unwrap().len(), 1);

    let (status, stats) = json_request(
        &server.router,
        "GET",
        "/v1/admin/approvals/stats",
        None,
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["pending"], 2);
    assert_eq!(stats["approved"], 1);
    assert_eq!(stats["under_review"], 1);
    assert_eq!(stats["rejected"], 0);
    assert_eq!(stats["total"], 4);
}

#[tokio::test]
async fn test_admin_product_view_shows_hidden_products() {
    let server = TestServer::new().await;
    let seller = server.create_seller("View Co").await;
    let product = server.create_pending_product(seller.seller_id, "Hidden").await;
    let token = create_test_token(&server, ADMIN_SCOPES).await;

    let (status, body) = json_request(
        &server.router,
        "GET",
        &format!("/v1/admin/products/{}", product.product_id),
        None,
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Hidden");
    assert_eq!(body["approval_status"], "pending");
}
