use axum::{http::HeaderValue, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Settings;
use crate::middleware::request_id_layer;
use crate::routes;
use crate::scheduling::{
    ConfidenceThreshold, DetectionConfig, RecommendationScorer, SchedulingStore,
};
use crate::services::{ConflictService, RedisCache};

/// Apply batches and posted conflicts stay well below this
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub conflicts: ConflictService,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn SchedulingStore>,
        cache: Option<RedisCache>,
        scorer: Option<Arc<dyn RecommendationScorer>>,
    ) -> Arc<Self> {
        let detection = DetectionConfig {
            travel_time_threshold_minutes: settings.travel_time_threshold_minutes,
            travel_distance_threshold_km: settings.travel_distance_threshold_km,
            max_range_days: settings.max_detection_range_days,
        };
        let conflicts = ConflictService::new(
            store,
            cache,
            detection,
            scorer,
            Duration::from_secs(settings.recommendation_timeout_seconds),
        );
        Arc::new(Self {
            settings,
            conflicts,
        })
    }

    /// Threshold from the request, or the configured default
    pub fn threshold(&self, requested: Option<ConfidenceThreshold>) -> ConfidenceThreshold {
        requested.unwrap_or_else(|| {
            ConfidenceThreshold::try_from(self.settings.default_confidence_threshold)
                .unwrap_or_default()
        })
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // DEBUG spans keep INFO output to the engine's own events
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let (set_request_id, propagate_request_id) = request_id_layer();

    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let max_age = if settings.env.is_dev() {
        Duration::from_secs(86400)
    } else {
        Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static("x-request-id"),
        ]))
        .max_age(max_age)
}
