//! Integration tests for the visibility repair endpoints.

mod common;

use axum::http::StatusCode;
use bazaar_server::repair::{RepairTrigger, run_repair};
use common::fixtures::product_row;
use common::{TestServer, create_test_token, json_request};

/// Seed one row per drift shape plus two consistent rows.
async fn seed_drift(server: &TestServer) -> uuid::Uuid {
    let seller = server.create_seller("Drifty").await;
    for (name, status, active, approved) in [
        ("approved-hidden", "approved", false, false),
        ("approved-half", "approved", false, true),
        ("rejected-visible", "rejected", true, true),
        ("review-visible", "under_review", true, false),
        ("pending-visible", "pending", true, true),
        ("ok-approved", "approved", true, true),
        ("ok-pending", "pending", false, false),
    ] {
        server
            .insert_product(&product_row(seller.seller_id, name, status, active, approved))
            .await;
    }
    seller.seller_id
}

#[tokio::test]
async fn test_manual_repair_fixes_drift_and_is_idempotent() {
    let server = TestServer::new().await;
    seed_drift(&server).await;
    let token = create_test_token(&server, r#"["platform:admin"]"#).await;

    let (status, body) =
        json_request(&server.router, "POST", "/v1/admin/repair", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["run"]["activated"], 2);
    assert_eq!(body["run"]["deactivated"], 2);
    assert_eq!(body["run"]["trigger"], "manual");
    assert_eq!(body["message"], "Activated 2 and deactivated 2 products");
    assert!(body["run"]["triggered_by"].is_string());
    assert!(body["run"]["error"].is_null());

    let (_, body) =
        json_request(&server.router, "POST", "/v1/admin/repair", None, Some(&token)).await;
    assert_eq!(body["run"]["activated"], 0);
    assert_eq!(body["run"]["deactivated"], 0);

    let (_, catalog) =
        json_request(&server.router, "GET", "/v1/catalog/products?limit=50", None, None).await;
    let mut names: Vec<_> = catalog["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    // Sweeps never touch pending rows, so pending-visible keeps its flags
    assert_eq!(
        names,
        vec![
            "approved-half",
            "approved-hidden",
            "ok-approved",
            "pending-visible"
        ]
    );
}

#[tokio::test]
async fn test_drift_report_is_read_only() {
    let server = TestServer::new().await;
    seed_drift(&server).await;
    let token = create_test_token(&server, r#"["approval:admin"]"#).await;

    let (status, report) =
        json_request(&server.router, "GET", "/v1/admin/repair/report", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["total"], 5);
    assert_eq!(report["repairable"], 4);
    assert_eq!(report["by_drift"]["approved_hidden"], 2);
    assert_eq!(report["by_drift"]["unapproved_visible"], 2);
    assert_eq!(report["by_drift"]["pending_visible"], 1);

    let pending = report["products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "pending-visible")
        .unwrap();
    assert_eq!(pending["drift"], "pending_visible");
    assert!(pending["repaired_by"].is_null());

    // Reporting twice changes nothing
    let (_, again) =
        json_request(&server.router, "GET", "/v1/admin/repair/report", None, Some(&token)).await;
    assert_eq!(again["total"], 5);
}

#[tokio::test]
async fn test_pending_drift_survives_repair() {
    let server = TestServer::new().await;
    seed_drift(&server).await;
    run_repair(&server.state, RepairTrigger::Manual, None)
        .await
        .unwrap();

    let token = create_test_token(&server, r#"["approval:admin"]"#).await;
    let (_, report) =
        json_request(&server.router, "GET", "/v1/admin/repair/report", None, Some(&token)).await;
    assert_eq!(report["total"], 1);
    assert_eq!(report["repairable"], 0);
    assert_eq!(report["products"][0]["name"], "pending-visible");
}

#[tokio::test]
async fn test_repair_runs_history() {
    let server = TestServer::new().await;
    seed_drift(&server).await;
    run_repair(&server.state, RepairTrigger::Startup, None)
        .await
        .unwrap();
    run_repair(&server.state, RepairTrigger::Scheduled, None)
        .await
        .unwrap();

    let token = create_test_token(&server, r#"["platform:admin"]"#).await;
    let (status, runs) =
        json_request(&server.router, "GET", "/v1/admin/repair/runs", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let runs = runs.as_array().unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0]["trigger"], "scheduled");
    assert_eq!(runs[0]["activated"], 0);
    assert_eq!(runs[1]["trigger"], "startup");
    assert_eq!(runs[1]["activated"], 2);
    assert!(runs[1]["finished_at"].is_string());

    let (_, limited) = json_request(
        &server.router,
        "GET",
        "/v1/admin/repair/runs?limit=1",
        None,
        Some(&token),
    )
    .await;
    assert_eq!(limited.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_repair_scopes() {
    let server = TestServer::new().await;
    let reviewer = create_test_token(&server, r#"["approval:admin"]"#).await;
    let customer = create_test_token(&server, r#"["catalog:read"]"#).await;

    let (status, _) =
        json_request(&server.router, "POST", "/v1/admin/repair", None, Some(&reviewer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        json_request(&server.router, "GET", "/v1/admin/repair/runs", None, Some(&reviewer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = json_request(
        &server.router,
        "GET",
        "/v1/admin/repair/report",
        None,
        Some(&customer),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = json_request(&server.router, "POST", "/v1/admin/repair", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}
