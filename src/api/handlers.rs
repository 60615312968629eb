//! REST API handlers using Axum

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::service::DashboardService;
use crate::dashboard::{AudiencePoint, DashboardView, SegmentationView};
use crate::error::DashboardError;
use crate::insights::{BusinessHealth, FrictionDiagnosis};
use crate::segments::{ClusterProfile, SegmentLabel, SegmentSummary, StrategyCard};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct SegmentResponse {
    pub label: SegmentLabel,
    pub name: String,
    pub alias: String,
    pub color: String,
    pub count: usize,
    pub share_pct: f64,
    pub mean_recency: Option<f64>,
    pub mean_frequency: Option<f64>,
    pub mean_monetary: Option<f64>,
    pub mean_avg_review_score: Option<f64>,
}

impl SegmentResponse {
    fn from_view(view: &SegmentationView, summary: &SegmentSummary) -> Self {
        let color = view
            .styles
            .iter()
            .find(|s| s.label == summary.label)
            .map(|s| s.color.clone())
            .unwrap_or_default();
        let share_pct = if view.total_customers > 0 {
            summary.count as f64 / view.total_customers as f64 * 100.0
        } else {
            0.0
        };
        Self {
            label: summary.label,
            name: summary.label.display_name().to_string(),
            alias: summary.label.alias().to_string(),
            color,
            count: summary.count,
            share_pct,
            mean_recency: summary.mean_recency,
            mean_frequency: summary.mean_frequency,
            mean_monetary: summary.mean_monetary,
            mean_avg_review_score: summary.mean_avg_review_score,
        }
    }
}

#[derive(Serialize)]
pub struct SegmentsResponse {
    pub policy: String,
    pub total_customers: usize,
    pub baseline_monetary: Option<f64>,
    pub monetary_cap: f64,
    pub segments: Vec<SegmentResponse>,
}

impl From<SegmentationView> for SegmentsResponse {
    fn from(view: SegmentationView) -> Self {
        let segments = view
            .summaries
            .iter()
            .map(|s| SegmentResponse::from_view(&view, s))
            .collect();
        Self {
            policy: view.policy.to_string(),
            total_customers: view.total_customers,
            baseline_monetary: view.baseline_monetary,
            monetary_cap: view.monetary_cap,
            segments,
        }
    }
}

#[derive(Serialize)]
pub struct SegmentDetailResponse {
    pub segment: SegmentResponse,
    pub strategy: Option<StrategyCard>,
    pub audience_points: usize,
    pub audience: Vec<AudiencePoint>,
}

#[derive(Serialize)]
pub struct ClusterResponse {
    pub cluster_id: i64,
    pub count: usize,
    pub segment: Option<SegmentLabel>,
    pub segment_share_pct: Option<f64>,
    pub mean_recency: Option<f64>,
    pub mean_frequency: Option<f64>,
    pub mean_monetary: Option<f64>,
    pub mean_avg_review_score: Option<f64>,
}

impl ClusterResponse {
    fn from_view(view: &SegmentationView, profile: &ClusterProfile) -> Self {
        let dominant = view.cluster_label(profile.cluster_id);
        Self {
            cluster_id: profile.cluster_id,
            count: profile.count,
            segment: dominant.map(|d| d.label),
            segment_share_pct: dominant.map(|d| d.share_pct),
            mean_recency: profile.mean_recency,
            mean_frequency: profile.mean_frequency,
            mean_monetary: profile.mean_monetary,
            mean_avg_review_score: profile.mean_avg_review_score,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub policy: String,
    pub cached_datasets: usize,
}

#[derive(Serialize)]
pub struct InvalidateResponse {
    pub invalidated: bool,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

// ============================================================================
// Errors
// ============================================================================

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: DashboardError) -> ApiError {
    let status = match &e {
        DashboardError::DatasetNotFound { .. } => StatusCode::SERVICE_UNAVAILABLE,
        DashboardError::UnmappedCluster { .. } | DashboardError::InvalidDataset { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("Request failed ({}): {}", status, e);
    (status, Json(ErrorResponse { error: e.to_string() }))
}

fn parse_label(raw: &str) -> Result<SegmentLabel, ApiError> {
    raw.parse::<SegmentLabel>()
        .map_err(|error| (StatusCode::NOT_FOUND, Json(ErrorResponse { error })))
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<DashboardService>;

/// GET /api/v1/health
pub async fn health(State(service): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        policy: service.config().segmentation.policy.kind().to_string(),
        cached_datasets: service.cached_datasets(),
    })
}

/// GET /api/v1/dashboard
pub async fn get_dashboard(State(service): State<AppState>) -> Result<Json<DashboardView>, ApiError> {
    service.dashboard().await.map(Json).map_err(api_error)
}

/// GET /api/v1/overview
pub async fn get_overview(State(service): State<AppState>) -> Result<Json<BusinessHealth>, ApiError> {
    service.overview().await.map(Json).map_err(api_error)
}

/// GET /api/v1/friction
pub async fn get_friction(State(service): State<AppState>) -> Result<Json<FrictionDiagnosis>, ApiError> {
    service.friction().await.map(Json).map_err(api_error)
}

/// GET /api/v1/segments
pub async fn get_segments(State(service): State<AppState>) -> Result<Json<SegmentsResponse>, ApiError> {
    match service.segmentation().await {
        Ok(view) => Ok(Json(SegmentsResponse::from(view))),
        Err(e) => Err(api_error(e)),
    }
}

/// GET /api/v1/segments/:label
pub async fn get_segment(
    State(service): State<AppState>,
    Path(label): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<SegmentDetailResponse>, ApiError> {
    let label = parse_label(&label)?;
    let limit = params.limit.unwrap_or(500);
    let audience = service.segment_audience(label).await.map_err(api_error)?;
    let view = &audience.view;

    let summary = view.summary(label).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("segment '{}' is not displayed", label.key()),
            }),
        )
    })?;

    Ok(Json(SegmentDetailResponse {
        segment: SegmentResponse::from_view(view, summary),
        strategy: view.card(label).cloned(),
        audience_points: audience.points.len(),
        audience: audience.points.iter().take(limit).cloned().collect(),
    }))
}

/// GET /api/v1/segments/:label/strategy
pub async fn get_strategy(
    State(service): State<AppState>,
    Path(label): Path<String>,
) -> Result<Json<StrategyCard>, ApiError> {
    let label = parse_label(&label)?;
    let view = service.segmentation().await.map_err(api_error)?;
    match view.card(label) {
        Some(card) => Ok(Json(card.clone())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no strategy for segment '{}'", label.key()),
            }),
        )),
    }
}

/// GET /api/v1/clusters
pub async fn get_clusters(State(service): State<AppState>) -> Result<Json<Vec<ClusterResponse>>, ApiError> {
    let view = service.segmentation().await.map_err(api_error)?;
    let response = view
        .cluster_profiles
        .iter()
        .map(|p| ClusterResponse::from_view(&view, p))
        .collect();
    Ok(Json(response))
}

/// POST /api/v1/cache/invalidate
pub async fn invalidate_cache(State(service): State<AppState>) -> impl IntoResponse {
    service.invalidate();
    Json(InvalidateResponse { invalidated: true })
}
