//! Strategic recommendations that span several conflicts of one type.
//!
//! The heuristic rules always run locally. An optional external scorer may then
//! adjust confidences; it is bounded by a timeout and any failure falls back to
//! the heuristic figures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    AiRecommendation, Complexity, ConflictType, RecommendationType, SchedulingConflict,
};

const DEFAULT_SCORER_TIMEOUT: Duration = Duration::from_secs(5);

/// Confidence assigned to one recommendation by an external scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationScore {
    pub recommendation_id: Uuid,
    pub confidence: u8,
}

#[async_trait]
pub trait RecommendationScorer: Send + Sync {
    async fn score(
        &self,
        recommendations: &[AiRecommendation],
    ) -> anyhow::Result<Vec<RecommendationScore>>;
}

#[derive(Clone)]
pub struct RecommendationSynthesizer {
    scorer: Option<Arc<dyn RecommendationScorer>>,
    timeout: Duration,
}

impl Default for RecommendationSynthesizer {
    fn default() -> Self {
        Self {
            scorer: None,
            timeout: DEFAULT_SCORER_TIMEOUT,
        }
    }
}

impl RecommendationSynthesizer {
    pub fn new(scorer: Option<Arc<dyn RecommendationScorer>>, timeout: Duration) -> Self {
        Self { scorer, timeout }
    }

    /// Recommendations for `conflicts`, highest confidence first
    #[instrument(skip_all, fields(conflicts = conflicts.len()))]
    pub async fn synthesize(&self, conflicts: &[SchedulingConflict]) -> Vec<AiRecommendation> {
        let mut recommendations = heuristic_recommendations(conflicts);

        if let (Some(scorer), false) = (&self.scorer, recommendations.is_empty()) {
            match tokio::time::timeout(self.timeout, scorer.score(&recommendations)).await {
                Ok(Ok(scores)) => apply_scores(&mut recommendations, &scores),
                Ok(Err(e)) => {
                    warn!(error = %e, "Recommendation scorer failed, keeping heuristic scores")
                }
                Err(_) => warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Recommendation scorer timed out, keeping heuristic scores"
                ),
            }
        }

        recommendations.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        debug!(recommendations = recommendations.len(), "Synthesized recommendations");
        recommendations
    }
}

fn apply_scores(recommendations: &mut [AiRecommendation], scores: &[RecommendationScore]) {
    let by_id: HashMap<Uuid, u8> = scores
        .iter()
        .map(|s| (s.recommendation_id, s.confidence.min(100)))
        .collect();
    for recommendation in recommendations.iter_mut() {
        if let Some(confidence) = by_id.get(&recommendation.id) {
            recommendation.confidence = *confidence;
        }
    }
}

/// Threshold rules over conflict counts per type, in rule order
pub fn heuristic_recommendations(conflicts: &[SchedulingConflict]) -> Vec<AiRecommendation> {
    let ids_of = |kind: ConflictType| -> Vec<Uuid> {
        conflicts
            .iter()
            .filter(|c| c.conflict_type == kind)
            .map(|c| c.id)
            .collect()
    };

    let mut recommendations = Vec::new();

    let overlaps = ids_of(ConflictType::TimeOverlap);
    if overlaps.len() > 2 {
        recommendations.push(AiRecommendation {
            id: Uuid::new_v4(),
            recommendation_type: RecommendationType::BulkResolution,
            title: "Resolve overlapping bookings in one pass".to_string(),
            description: format!(
                "{} time overlaps share the same calendar; reschedule them together instead of one at a time",
                overlaps.len()
            ),
            action_plan: vec![
                "Review the overlapping jobs side by side".to_string(),
                "Apply the top reschedule for each overlap".to_string(),
                "Notify affected customers of new times".to_string(),
            ],
            conflict_ids: overlaps,
            confidence: 85,
            complexity: Complexity::Medium,
            estimated_benefit: "Clears all double bookings in a single review".to_string(),
        });
    }

    let capacity = ids_of(ConflictType::CapacityExceeded);
    if capacity.len() > 1 {
        recommendations.push(AiRecommendation {
            id: Uuid::new_v4(),
            recommendation_type: RecommendationType::PreventiveMeasure,
            title: "Cap daily assignments per installer".to_string(),
            description: format!(
                "{} member-days are over capacity; set a daily job limit so new bookings spread across the team",
                capacity.len()
            ),
            action_plan: vec![
                "Set max daily jobs for overloaded installers".to_string(),
                "Redistribute the excess jobs".to_string(),
            ],
            conflict_ids: capacity,
            confidence: 92,
            complexity: Complexity::Low,
            estimated_benefit: "Prevents recurring overtime".to_string(),
        });
    }

    let travel = ids_of(ConflictType::TravelDistance);
    if travel.len() > 1 {
        recommendations.push(AiRecommendation {
            id: Uuid::new_v4(),
            recommendation_type: RecommendationType::Optimization,
            title: "Group jobs by region".to_string(),
            description: format!(
                "{} long trips between consecutive jobs; cluster each installer's day geographically",
                travel.len()
            ),
            action_plan: vec![
                "Assign installers to home regions".to_string(),
                "Order each day's jobs by location".to_string(),
                "Re-run detection after re-routing".to_string(),
            ],
            conflict_ids: travel,
            confidence: 78,
            complexity: Complexity::High,
            estimated_benefit: "Less drive time and fuel cost per day".to_string(),
        });
    }

    recommendations
}
