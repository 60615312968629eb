//! REST interface to the dashboard views

pub mod handlers;
pub mod service;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use service::{DashboardService, SegmentAudience};

pub fn create_router(service: Arc<DashboardService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/dashboard", get(handlers::get_dashboard))
        .route("/api/v1/overview", get(handlers::get_overview))
        .route("/api/v1/friction", get(handlers::get_friction))
        // Segments
        .route("/api/v1/segments", get(handlers::get_segments))
        .route("/api/v1/segments/:label", get(handlers::get_segment))
        .route("/api/v1/segments/:label/strategy", get(handlers::get_strategy))
        .route("/api/v1/clusters", get(handlers::get_clusters))
        .route("/api/v1/cache/invalidate", post(handlers::invalidate_cache))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
