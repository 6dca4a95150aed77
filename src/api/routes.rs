//! API Routes
//!
//! Configures the Axum router with all endpoints nested under `/api/v1`.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    average_price_handler, cache_stats_handler, create_collection_handler,
    data_status_handler, delete_collection_handler, driver_history_handler,
    driver_ranking_handler, get_collection_handler, health_handler, list_collections_handler,
    login_handler, me_handler, price_history_handler, top_consumer_handler,
    total_revenue_handler, update_collection_handler, volume_by_vehicle_handler,
};
use super::AppState;

/// Version prefix of every route.
pub const API_PREFIX: &str = "/api/v1";

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/token", post(login_handler))
        .route("/auth/me", get(me_handler))
        .route("/data-status", get(data_status_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route(
            "/collections",
            get(list_collections_handler).post(create_collection_handler),
        )
        .route(
            "/collections/:id",
            get(get_collection_handler)
                .put(update_collection_handler)
                .delete(delete_collection_handler),
        )
        .route("/dashboard/average-price", get(average_price_handler))
        .route("/dashboard/volume-by-vehicle", get(volume_by_vehicle_handler))
        .route("/dashboard/price-history", get(price_history_handler))
        .route("/dashboard/top-consumer", get(top_consumer_handler))
        .route("/dashboard/total-revenue", get(total_revenue_handler))
        .route("/drivers/history", get(driver_history_handler))
        .route("/drivers/ranking", get(driver_ranking_handler));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
