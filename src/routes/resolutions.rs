//! Resolution apply endpoint

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::domain::ConflictResolution;
use crate::error::ApiResult;
use crate::middleware::RequestIdExt;
use crate::scheduling::TenantScope;

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub resolutions: Vec<ConflictResolution>,
    pub performed_by: String,
}

/// POST /organizations/:organization_id/projects/:project_id/resolutions/apply
///
/// Partial success is still a 200; the body lists what failed.
pub async fn apply_resolutions(
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    body: Result<Json<ApplyRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(mut req) = body?;
    let scope = TenantScope::new(organization_id, project_id);

    let report = state
        .conflicts
        .apply(&scope, &mut req.resolutions, &req.performed_by)
        .await?;

    tracing::info!(
        request_id = headers.request_id(),
        organization_id = %organization_id,
        project_id = %project_id,
        applied = report.applied.len(),
        failed = report.failed.len(),
        "Resolutions applied"
    );

    Ok(Json(DataResponse::new(report)))
}
