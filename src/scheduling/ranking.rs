//! Confidence filtering and ordering of resolution candidates.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use uuid::Uuid;

use super::error::SchedulingError;
use crate::domain::{ConflictResolution, SchedulingConflict};

/// Minimum confidence (0-100) a candidate needs to be offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ConfidenceThreshold(u8);

impl ConfidenceThreshold {
    pub const DEFAULT: Self = Self(70);

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for ConfidenceThreshold {
    type Error = SchedulingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 100 {
            return Err(SchedulingError::validation(format!(
                "confidence threshold must be between 0 and 100, got {}",
                value
            )));
        }
        Ok(Self(value))
    }
}

impl From<ConfidenceThreshold> for u8 {
    fn from(threshold: ConfidenceThreshold) -> Self {
        threshold.0
    }
}

/// Keep candidates with `confidence >= threshold`, preserving order
pub fn filter_by_confidence(
    resolutions: Vec<ConflictResolution>,
    threshold: ConfidenceThreshold,
) -> Vec<ConflictResolution> {
    resolutions
        .into_iter()
        .filter(|r| r.confidence >= threshold.value())
        .collect()
}

fn by_rank(a: &ConflictResolution, b: &ConflictResolution) -> Ordering {
    b.confidence
        .cmp(&a.confidence)
        .then_with(|| a.impact.cost_impact.cmp(&b.impact.cost_impact))
}

/// Highest confidence first; cheaper candidates win ties. Stable.
pub fn rank_resolutions(resolutions: &mut [ConflictResolution]) {
    resolutions.sort_by(by_rank);
}

/// The best applicable candidate of each auto-resolvable conflict.
///
/// Candidates flagged for manual review or below `threshold` are never picked.
/// Conflicts without such a candidate are left out, as are conflicts sharing a
/// job with an earlier pick: their candidates were computed against a schedule
/// that pick is about to change.
pub fn select_auto_resolutions(
    conflicts: &[SchedulingConflict],
    threshold: ConfidenceThreshold,
) -> Vec<ConflictResolution> {
    let mut touched: HashSet<Uuid> = HashSet::new();
    let mut picked = Vec::new();

    for conflict in conflicts.iter().filter(|conflict| conflict.auto_resolvable) {
        let Some(best) = conflict
            .suggested_resolutions
            .iter()
            .filter(|r| !r.requires_manual_review && r.confidence >= threshold.value())
            .min_by(|a, b| by_rank(a, b))
        else {
            continue;
        };

        let jobs: Vec<Uuid> = conflict
            .affected_jobs
            .iter()
            .copied()
            .chain(best.proposed_changes.iter().map(|c| c.installation_id))
            .collect();
        if jobs.iter().any(|job| touched.contains(job)) {
            continue;
        }
        touched.extend(jobs);
        picked.push(best.clone());
    }

    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConflictSeverity, ConflictType, ImpactLevel, ResolutionImpact, ResolutionMethod,
        ResolutionStatus,
    };
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn candidate(confidence: u8, cost: i64) -> ConflictResolution {
        ConflictResolution {
            id: Uuid::new_v4(),
            conflict_id: Uuid::nil(),
            method: ResolutionMethod::Reschedule,
            description: format!("{} / {}", confidence, cost),
            confidence,
            impact: ResolutionImpact {
                affected_assignments: 1,
                customer_impact: ImpactLevel::Low,
                team_impact: ImpactLevel::Low,
                cost_impact: Decimal::new(cost, 0),
                time_impact_minutes: 0,
            },
            proposed_changes: Vec::new(),
            requires_manual_review: false,
            status: ResolutionStatus::Pending,
        }
    }

    fn conflict(auto_resolvable: bool, resolutions: Vec<ConflictResolution>) -> SchedulingConflict {
        SchedulingConflict {
            id: Uuid::new_v4(),
            conflict_type: ConflictType::TimeOverlap,
            severity: ConflictSeverity::Medium,
            description: String::new(),
            affected_jobs: Vec::new(),
            affected_team_members: Vec::new(),
            slots: Vec::new(),
            date: None,
            detected_at: Utc::now(),
            auto_resolvable,
            impact_score: 30,
            suggested_resolutions: resolutions,
        }
    }

    #[test]
    fn test_threshold_bounds() {
        assert_eq!(ConfidenceThreshold::default().value(), 70);
        assert!(ConfidenceThreshold::try_from(100).is_ok());
        assert!(matches!(
            ConfidenceThreshold::try_from(101),
            Err(SchedulingError::Validation(_))
        ));
    }

    #[test]
    fn test_threshold_deserializes_with_validation() {
        let ok: ConfidenceThreshold = serde_json::from_str("80").unwrap();
        assert_eq!(ok.value(), 80);
        assert!(serde_json::from_str::<ConfidenceThreshold>("150").is_err());
    }

    #[test]
    fn test_default_threshold_drops_manual_reschedule() {
        let kept = filter_by_confidence(
            vec![candidate(85, 0), candidate(78, 0), candidate(60, 0)],
            ConfidenceThreshold::default(),
        );
        let confidences: Vec<u8> = kept.iter().map(|r| r.confidence).collect();
        assert_eq!(confidences, vec![85, 78]);
    }

    #[test]
    fn test_rank_breaks_ties_on_cost() {
        let mut resolutions = vec![candidate(80, 0), candidate(90, 10), candidate(80, -50)];
        rank_resolutions(&mut resolutions);
        let order: Vec<(u8, Decimal)> = resolutions
            .iter()
            .map(|r| (r.confidence, r.impact.cost_impact))
            .collect();
        assert_eq!(
            order,
            vec![
                (90, Decimal::new(10, 0)),
                (80, Decimal::new(-50, 0)),
                (80, Decimal::ZERO)
            ]
        );
    }

    #[test]
    fn test_auto_selection_skips_manual_and_unresolvable() {
        let mut manual = candidate(95, 0);
        manual.requires_manual_review = true;
        let best = candidate(85, 0);
        let conflicts = vec![
            conflict(true, vec![manual, best.clone(), candidate(78, 0)]),
            conflict(false, vec![candidate(99, 0)]),
            conflict(true, vec![candidate(60, 0)]),
        ];

        let picked = select_auto_resolutions(&conflicts, ConfidenceThreshold::default());
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, best.id);
    }

    #[test]
    fn test_auto_selection_skips_conflicts_sharing_a_job() {
        let (a, b, c) = (Uuid::from_u128(1), Uuid::from_u128(2), Uuid::from_u128(3));
        let mut first = conflict(true, vec![candidate(85, 0)]);
        first.affected_jobs = vec![a, b];
        let mut chained = conflict(true, vec![candidate(85, 0)]);
        chained.affected_jobs = vec![b, c];
        let mut apart = conflict(true, vec![candidate(85, 0)]);
        apart.affected_jobs = vec![Uuid::from_u128(4), Uuid::from_u128(5)];

        let picked = select_auto_resolutions(
            &[first.clone(), chained, apart.clone()],
            ConfidenceThreshold::default(),
        );
        let ids: Vec<Uuid> = picked.iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                first.suggested_resolutions[0].id,
                apart.suggested_resolutions[0].id
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_filter_keeps_exactly_the_qualifying(
            confidences in proptest::collection::vec(0u8..=100, 0..20),
            threshold in 0u8..=100,
        ) {
            let resolutions: Vec<ConflictResolution> =
                confidences.iter().map(|c| candidate(*c, 0)).collect();
            let threshold = ConfidenceThreshold::try_from(threshold).unwrap();
            let kept = filter_by_confidence(resolutions.clone(), threshold);

            prop_assert!(kept.iter().all(|r| r.confidence >= threshold.value()));
            let expected: Vec<Uuid> = resolutions
                .iter()
                .filter(|r| r.confidence >= threshold.value())
                .map(|r| r.id)
                .collect();
            let actual: Vec<Uuid> = kept.iter().map(|r| r.id).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn prop_zero_threshold_is_identity(
            confidences in proptest::collection::vec(0u8..=100, 0..20),
        ) {
            let resolutions: Vec<ConflictResolution> =
                confidences.iter().map(|c| candidate(*c, 0)).collect();
            let zero = ConfidenceThreshold::try_from(0).unwrap();
            prop_assert_eq!(filter_by_confidence(resolutions.clone(), zero), resolutions);
        }
    }
}
