use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::error::ApiResult;
use crate::scheduling::{DateRange, TenantScope};

#[derive(Debug, Deserialize)]
pub struct WorkloadQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// GET /organizations/:organization_id/projects/:project_id/workload
pub async fn get_workload(
    State(state): State<Arc<AppState>>,
    Path((organization_id, project_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<WorkloadQuery>,
) -> ApiResult<impl IntoResponse> {
    let summaries = state
        .conflicts
        .workload(
            &TenantScope::new(organization_id, project_id),
            &DateRange::new(query.start_date, query.end_date),
        )
        .await?;

    Ok(Json(DataResponse::new(summaries)))
}
