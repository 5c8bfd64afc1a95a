pub mod conflicts;
pub mod health;
pub mod resolutions;
pub mod workload;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;

const PROJECT: &str = "/organizations/:organization_id/projects/:project_id";

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    let project_routes = Router::new()
        .route("/conflicts/detect", post(conflicts::detect_conflicts))
        .route("/conflicts/resolutions", post(conflicts::generate_resolutions))
        .route(
            "/conflicts/recommendations",
            post(conflicts::synthesize_recommendations),
        )
        .route("/conflicts/auto-resolve", post(conflicts::auto_resolve))
        .route("/resolutions/apply", post(resolutions::apply_resolutions))
        .route("/workload", get(workload::get_workload));

    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        .nest(PROJECT, project_routes)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::app::{create_app, AppState};
    use crate::config::Settings;
    use crate::scheduling::test_support::*;
    use crate::scheduling::TenantScope;
    use crate::services::InMemoryStore;

    fn base() -> String {
        format!("/organizations/{}/projects/{}", org(), project())
    }

    fn app_with(store: Arc<InMemoryStore>) -> Router {
        create_app(AppState::new(Settings::for_tests(), store, None, None))
    }

    fn seeded_app() -> (Router, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        store.seed(
            TenantScope::new(org(), project()),
            vec![
                assignment(1, 100, day(4), time(9, 0), 60),
                assignment(2, 100, day(4), time(9, 30), 60),
            ],
            vec![member(100), member(200)],
        );
        (app_with(store.clone()), store)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_with_memory_store() {
        let (app, _) = seeded_app();
        let (status, body) = send(app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["services"]["redis"], "disabled");
    }

    #[tokio::test]
    async fn test_detect_returns_conflicts_and_summary() {
        let (app, _) = seeded_app();
        let (status, body) = send(
            app,
            "POST",
            &format!("{}/conflicts/detect", base()),
            Some(json!({ "start_date": "2024-03-01", "end_date": "2024-03-07" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["summary"]["total"], 1);
        assert_eq!(data["conflicts"][0]["type"], "time_overlap");
        assert_eq!(data["conflicts"][0]["severity"], "medium");
        let resolutions = data["conflicts"][0]["suggested_resolutions"].as_array().unwrap();
        assert_eq!(resolutions[0]["type"], "reschedule");
        assert_eq!(resolutions[0]["proposed_changes"][0]["type"], "reschedule");
    }

    #[tokio::test]
    async fn test_detect_rejects_reversed_range() {
        let (app, _) = seeded_app();
        let (status, body) = send(
            app,
            "POST",
            &format!("{}/conflicts/detect", base()),
            Some(json!({ "start_date": "2024-03-07", "end_date": "2024-03-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_out_of_range_threshold_is_bad_request() {
        let (app, _) = seeded_app();
        let (status, _) = send(
            app,
            "POST",
            &format!("{}/conflicts/detect", base()),
            Some(json!({
                "start_date": "2024-03-01",
                "end_date": "2024-03-07",
                "confidence_threshold": 140
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_detect_then_apply_reassignment() {
        let (app, store) = seeded_app();
        let (_, detected) = send(
            app.clone(),
            "POST",
            &format!("{}/conflicts/detect", base()),
            Some(json!({ "start_date": "2024-03-04", "end_date": "2024-03-04" })),
        )
        .await;
        let reassign = detected["data"]["conflicts"][0]["suggested_resolutions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["type"] == "reassign")
            .cloned()
            .unwrap();

        let (status, body) = send(
            app,
            "POST",
            &format!("{}/resolutions/apply", base()),
            Some(json!({ "resolutions": [reassign], "performed_by": "dispatcher" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["applied"].as_array().unwrap().len(), 1);

        let first = store.assignment(Uuid::from_u128(1001)).unwrap();
        assert_eq!(first.lead_id, Uuid::from_u128(200));
        assert_eq!(first.history.len(), 1);
        assert_eq!(first.history[0].performed_by, "dispatcher");
    }

    #[tokio::test]
    async fn test_apply_empty_batch_is_bad_request() {
        let (app, _) = seeded_app();
        let (status, _) = send(
            app,
            "POST",
            &format!("{}/resolutions/apply", base()),
            Some(json!({ "resolutions": [], "performed_by": "dispatcher" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auto_resolve_endpoint() {
        let (app, _) = seeded_app();
        let (status, body) = send(
            app,
            "POST",
            &format!("{}/conflicts/auto-resolve", base()),
            Some(json!({
                "start_date": "2024-03-04",
                "end_date": "2024-03-05",
                "performed_by": "auto"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["conflicts_detected"], 1);
        assert_eq!(body["data"]["report"]["applied"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_workload_endpoint() {
        let (app, _) = seeded_app();
        let (status, body) = send(
            app,
            "GET",
            &format!("{}/workload?start_date=2024-03-04&end_date=2024-03-04", base()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let summaries = body["data"].as_array().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0]["assigned_minutes"], 120);
        assert_eq!(summaries[0]["job_count"], 2);
    }

    #[tokio::test]
    async fn test_recommendations_endpoint_with_no_conflicts() {
        let (app, _) = seeded_app();
        let (status, body) = send(
            app,
            "POST",
            &format!("{}/conflicts/recommendations", base()),
            Some(json!({ "conflicts": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["recommendations"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolutions_endpoint_reports_filtered_total() {
        let (app, _) = seeded_app();
        let (_, detected) = send(
            app.clone(),
            "POST",
            &format!("{}/conflicts/detect", base()),
            Some(json!({ "start_date": "2024-03-04", "end_date": "2024-03-04" })),
        )
        .await;
        let conflict = detected["data"]["conflicts"][0].clone();

        let (status, body) = send(
            app,
            "POST",
            &format!("{}/conflicts/resolutions", base()),
            Some(json!({ "conflict": conflict, "confidence_threshold": 80 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_candidates"], 2);
        assert_eq!(body["data"]["resolutions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolutions_for_conflict_without_slots() {
        let (app, _) = seeded_app();
        let conflict = json!({
            "id": Uuid::new_v4(),
            "type": "time_overlap",
            "severity": "medium",
            "description": "Reported by a dispatcher",
            "affected_jobs": [Uuid::from_u128(1), Uuid::from_u128(2)],
            "affected_team_members": [Uuid::from_u128(100)],
            "detected_at": "2024-03-01T08:00:00Z",
            "auto_resolvable": true,
            "impact_score": 30
        });

        let (status, body) = send(
            app,
            "POST",
            &format!("{}/conflicts/resolutions", base()),
            Some(json!({ "conflict": conflict })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_candidates"], 2);
        let first = &body["data"]["resolutions"][0];
        assert_eq!(first["type"], "reschedule");
        assert_eq!(
            first["proposed_changes"][0]["installation_id"],
            Uuid::from_u128(1).to_string()
        );
        assert_eq!(first["proposed_changes"][0]["proposed_time"], "10:30:00");
    }
}
