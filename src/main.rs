mod api;
mod app;
mod config;
mod db;
mod domain;
mod error;
mod logging;
mod middleware;
mod routes;
mod scheduling;
mod services;

use anyhow::Result;
use std::sync::Arc;

use scheduling::{RecommendationScorer, SchedulingStore};
use services::{InMemoryStore, PgSchedulingStore, RedisCache, ScoringClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = config::Settings::from_env()?;

    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting installation scheduling backend"
    );

    let store: Arc<dyn SchedulingStore> = match &settings.database_url {
        Some(url) => {
            let pool = db::create_pool(url, settings.database_max_connections).await?;
            Arc::new(PgSchedulingStore::new(pool))
        }
        None => match &settings.dev_fixture_path {
            Some(path) => {
                tracing::warn!(fixture = %path, "DATABASE_URL not set, using an in-memory store");
                Arc::new(InMemoryStore::from_fixture_file(path)?)
            }
            None => {
                tracing::warn!(
                    "DATABASE_URL and DEV_FIXTURE_PATH not set, in-memory store is empty; \
                     every project reads empty and applies fail with not found"
                );
                Arc::new(InMemoryStore::new())
            }
        },
    };

    let cache = match &settings.redis_url {
        Some(url) => Some(RedisCache::new(url, settings.conflict_cache_ttl_seconds).await?),
        None => {
            tracing::info!("REDIS_URL not set, detection cache disabled");
            None
        }
    };

    let scorer: Option<Arc<dyn RecommendationScorer>> = match &settings.scoring_service_url {
        Some(url) => {
            let client = ScoringClient::new(
                url,
                settings.scoring_service_token.as_deref(),
                settings.recommendation_timeout_seconds,
            )?;

            // Non-blocking; recommendations fall back to heuristics anyway
            tokio::spawn({
                let client = client.clone();
                async move {
                    match client.health_check().await {
                        Ok(()) => tracing::info!("Scoring service is healthy"),
                        Err(e) => tracing::warn!(error = %e, "Scoring service health check failed"),
                    }
                }
            });

            Some(Arc::new(client))
        }
        None => None,
    };

    let state = app::AppState::new(settings.clone(), store, cache, scorer);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
