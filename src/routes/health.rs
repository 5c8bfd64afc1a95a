use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub store: String,
    pub redis: String,
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let cache = state.conflicts.cache();
    let (store_result, redis_result) = tokio::join!(state.conflicts.store().ping(), async {
        match cache {
            Some(cache) => Some(cache.health_check().await),
            None => None,
        }
    });

    let store_status = if store_result.is_ok() { "ok" } else { "error" };
    let redis_status = match &redis_result {
        Some(Ok(())) => "ok",
        Some(Err(_)) => "error",
        None => "disabled",
    };

    // The store is critical; a failing cache only degrades
    let status = match (&store_result, &redis_result) {
        (Err(_), _) => "unhealthy",
        (Ok(()), Some(Err(_))) => "degraded",
        _ => "healthy",
    };

    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                store: store_status.to_string(),
                redis: redis_status.to_string(),
            },
        }),
    )
}
