use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::status))
        // Recommendations
        .route("/recommendations", get(handlers::recommendations))
        .route(
            "/fulltext-recommendations",
            get(handlers::fulltext_recommendations),
        )
        .route(
            "/ml/recommendations/:customer_id",
            get(handlers::ml_recommendations),
        )
        // Admin
        .route("/admin/model/rebuild", post(handlers::rebuild_model))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
