//! Conflict detection, resolution candidates, recommendations and auto-resolve.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::domain::{AiRecommendation, SchedulingConflict};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestIdExt;
use crate::scheduling::{ConfidenceThreshold, DateRange, TenantScope};

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub confidence_threshold: Option<ConfidenceThreshold>,
}

#[derive(Debug, Deserialize)]
pub struct ResolutionsRequest {
    pub conflict: SchedulingConflict,
    #[serde(default)]
    pub confidence_threshold: Option<ConfidenceThreshold>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationsRequest {
    pub conflicts: Vec<SchedulingConflict>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<AiRecommendation>,
}

#[derive(Debug, Deserialize)]
pub struct AutoResolveRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub confidence_threshold: Option<ConfidenceThreshold>,
    pub performed_by: String,
}

/// POST /organizations/:organization_id/projects/:project_id/conflicts/detect
pub async fn detect_conflicts(
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let scope = TenantScope::new(organization_id, project_id);
    let threshold = state.threshold(req.confidence_threshold);

    let report = state
        .conflicts
        .detect(&scope, &DateRange::new(req.start_date, req.end_date), threshold)
        .await?;

    tracing::info!(
        request_id = headers.request_id(),
        organization_id = %organization_id,
        project_id = %project_id,
        conflicts = report.summary.total,
        "Conflicts detected"
    );

    Ok(Json(DataResponse::new(report)))
}

/// POST /organizations/:organization_id/projects/:project_id/conflicts/resolutions
pub async fn generate_resolutions(
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<ResolutionsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let scope = TenantScope::new(organization_id, project_id);
    if req.conflict.affected_jobs.is_empty() {
        return Err(ApiError::BadRequest(
            "conflict must list at least one affected job".to_string(),
        ));
    }

    let candidates = state
        .conflicts
        .resolutions(&scope, &req.conflict, state.threshold(req.confidence_threshold))
        .await?;

    Ok(Json(DataResponse::new(candidates)))
}

/// POST /organizations/:organization_id/projects/:project_id/conflicts/recommendations
pub async fn synthesize_recommendations(
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<RecommendationsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let recommendations = state.conflicts.recommendations(&req.conflicts).await;

    tracing::debug!(
        organization_id = %organization_id,
        project_id = %project_id,
        recommendations = recommendations.len(),
        "Recommendations synthesized"
    );

    Ok(Json(DataResponse::new(RecommendationsResponse { recommendations })))
}

/// POST /organizations/:organization_id/projects/:project_id/conflicts/auto-resolve
pub async fn auto_resolve(
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    body: Result<Json<AutoResolveRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let scope = TenantScope::new(organization_id, project_id);

    let outcome = state
        .conflicts
        .auto_resolve(
            &scope,
            &DateRange::new(req.start_date, req.end_date),
            state.threshold(req.confidence_threshold),
            &req.performed_by,
        )
        .await?;

    tracing::info!(
        request_id = headers.request_id(),
        performed_by = %req.performed_by,
        applied = outcome.report.applied.len(),
        failed = outcome.report.failed.len(),
        "Auto-resolve completed"
    );

    Ok(Json(DataResponse::new(outcome)))
}
