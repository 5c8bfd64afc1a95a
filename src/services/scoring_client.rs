//! Client for the external recommendation scoring service.
//!
//! Server errors and connection failures are retried with exponential backoff;
//! 4xx responses are returned immediately. The synthesizer bounds the whole
//! exchange with its own timeout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoffBuilder};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::AiRecommendation;
use crate::scheduling::{RecommendationScore, RecommendationScorer};

const SCORE_PATH: &str = "/v1/recommendations/score";

#[derive(Clone)]
pub struct ScoringClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    max_retry_elapsed: Duration,
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    recommendations: &'a [AiRecommendation],
}

#[derive(Deserialize)]
struct ScoreResponse {
    scores: Vec<RecommendationScore>,
}

/// Error body returned by the scoring service.
#[derive(Debug, Deserialize)]
struct ScoringErrorResponse {
    message: String,
}

impl ScoringClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, "Scoring client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
            max_retry_elapsed: Duration::from_secs(timeout_seconds),
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Scoring service health check failed")?
            .error_for_status()
            .context("Scoring service unhealthy")?;

        Ok(())
    }

    async fn post_scores(
        &self,
        recommendations: &[AiRecommendation],
    ) -> Result<Vec<RecommendationScore>, backoff::Error<anyhow::Error>> {
        let url = format!("{}{}", self.base_url, SCORE_PATH);
        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(token) = &self.token {
            req = req.header("X-Internal-Token", token);
        }

        let response = req
            .json(&ScoreRequest { recommendations })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Scoring service request failed");
                backoff::Error::transient(anyhow::anyhow!("scoring service unavailable: {}", e))
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<ScoreResponse>()
                .await
                .map(|body| body.scores)
                .map_err(|e| {
                    backoff::Error::permanent(anyhow::anyhow!("invalid scoring response: {}", e))
                });
        }

        let message = response
            .json::<ScoringErrorResponse>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| format!("scoring service error: {}", status));
        let error = anyhow::anyhow!(message);
        if status.is_server_error() {
            warn!(status = %status, "Scoring service error, retrying");
            Err(backoff::Error::transient(error))
        } else {
            Err(backoff::Error::permanent(error))
        }
    }
}

#[async_trait]
impl RecommendationScorer for ScoringClient {
    #[instrument(skip_all, fields(recommendations = recommendations.len()))]
    async fn score(&self, recommendations: &[AiRecommendation]) -> Result<Vec<RecommendationScore>> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_elapsed_time(Some(self.max_retry_elapsed))
            .build();

        let scores = retry(policy, || self.post_scores(recommendations)).await?;
        debug!(scores = scores.len(), "Scoring service responded");
        Ok(scores)
    }
}
