//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Health check (unauthenticated for load balancers/probes)
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/auth/whoami", get(handlers::whoami))
        // Storefront
        .route("/v1/catalog/products", get(handlers::list_catalog))
        .route(
            "/v1/catalog/products/{product_id}",
            get(handlers::get_catalog_product),
        )
        // Seller dashboard (seller:write on a seller-bound token)
        .route(
            "/v1/seller/products",
            post(handlers::create_product).get(handlers::list_seller_products),
        )
        .route(
            "/v1/seller/products/{product_id}",
            get(handlers::get_seller_product)
                .put(handlers::update_seller_product)
                .delete(handlers::delete_seller_product),
        )
        .route("/v1/seller/stats", get(handlers::seller_stats))
        .route("/v1/seller/notifications", get(handlers::list_notifications))
        .route(
            "/v1/seller/notifications/{notification_id}/read",
            post(handlers::mark_notification_read),
        )
        // Approval console (approval:admin)
        .route("/v1/admin/approvals", get(handlers::list_approval_queue))
        .route("/v1/admin/approvals/stats", get(handlers::approval_stats))
        .route(
            "/v1/admin/products/{product_id}",
            get(handlers::get_admin_product),
        )
        .route(
            "/v1/admin/products/{product_id}/approval",
            put(handlers::update_approval),
        )
        .route("/v1/admin/repair/report", get(handlers::get_drift_report))
        // Platform administration (platform:admin)
        .route("/v1/admin/repair", post(handlers::trigger_repair))
        .route("/v1/admin/repair/runs", get(handlers::list_repair_runs))
        .route(
            "/v1/admin/sellers",
            post(handlers::create_seller).get(handlers::list_sellers),
        )
        .route("/v1/admin/sellers/{seller_id}", get(handlers::get_seller))
        .route(
            "/v1/admin/tokens",
            post(handlers::create_token).get(handlers::list_tokens),
        )
        .route(
            "/v1/admin/tokens/{token_id}",
            delete(handlers::revoke_token),
        );

    let mut router = Router::new().merge(api_routes);

    // When enabled, this endpoint should be network-restricted to the scraper.
    if state.config.server.metrics_enabled {
        let metrics_routes = Router::new().route("/metrics", get(metrics_handler));
        router = router.merge(metrics_routes);
    }

    // Layers run outermost first: TraceLayer -> Auth -> Handler
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
