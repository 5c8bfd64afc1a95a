//! Cross-conflict strategic recommendations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recommendation family
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    BulkResolution,
    PreventiveMeasure,
    Optimization,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BulkResolution => "bulk_resolution",
            Self::PreventiveMeasure => "preventive_measure",
            Self::Optimization => "optimization",
        }
    }
}

/// Implementation effort of a recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Strategy spanning several conflicts of the same type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiRecommendation {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    pub title: String,
    pub description: String,
    pub conflict_ids: Vec<Uuid>,
    pub action_plan: Vec<String>,
    pub confidence: u8,
    pub complexity: Complexity,
    pub estimated_benefit: String,
}
