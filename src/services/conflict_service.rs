//! Orchestrates the scheduling engine against a store and the detection cache.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::cache::{keys, RedisCache};
use crate::domain::{AiRecommendation, ConflictResolution, SchedulingConflict};
use crate::scheduling::detector::{placed_slots, slot_of};
use crate::scheduling::{
    filter_by_confidence, rank_resolutions, select_auto_resolutions, workload, ApplyReport,
    ConfidenceThreshold, ConflictDetector, ConflictSummary, DateRange, DetectionConfig,
    RecommendationScorer, RecommendationSynthesizer, ResolutionApplier, ResolutionGenerator,
    SchedulingResult, SchedulingStore, TenantScope, WorkloadSummary,
};

/// Conflicts for a range with their filtered resolutions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub range: DateRange,
    pub confidence_threshold: ConfidenceThreshold,
    pub conflicts: Vec<SchedulingConflict>,
    pub summary: ConflictSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionCandidates {
    pub resolutions: Vec<ConflictResolution>,
    /// Candidates generated before the confidence filter
    pub total_candidates: usize,
    pub confidence_threshold: ConfidenceThreshold,
}

/// Detect-and-apply rounds one auto-resolve run may take
const AUTO_RESOLVE_MAX_PASSES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoResolveReport {
    pub conflicts_detected: usize,
    /// Conflicts still present after the last pass
    pub conflicts_remaining: usize,
    pub passes: usize,
    pub selected: Vec<ConflictResolution>,
    pub report: ApplyReport,
}

#[derive(Clone)]
pub struct ConflictService {
    store: Arc<dyn SchedulingStore>,
    cache: Option<RedisCache>,
    detector: ConflictDetector,
    generator: ResolutionGenerator,
    synthesizer: RecommendationSynthesizer,
    applier: ResolutionApplier,
}

impl ConflictService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        cache: Option<RedisCache>,
        detection: DetectionConfig,
        scorer: Option<Arc<dyn RecommendationScorer>>,
        recommendation_timeout: Duration,
    ) -> Self {
        Self {
            applier: ResolutionApplier::new(store.clone()),
            store,
            cache,
            detector: ConflictDetector::new(detection),
            generator: ResolutionGenerator::default(),
            synthesizer: RecommendationSynthesizer::new(scorer, recommendation_timeout),
        }
    }

    pub fn store(&self) -> &Arc<dyn SchedulingStore> {
        &self.store
    }

    pub fn cache(&self) -> Option<&RedisCache> {
        self.cache.as_ref()
    }

    /// Detect conflicts in `range`, serving from cache when possible
    #[instrument(skip(self), fields(organization_id = %scope.organization_id, project_id = %scope.project_id))]
    pub async fn detect(
        &self,
        scope: &TenantScope,
        range: &DateRange,
        threshold: ConfidenceThreshold,
    ) -> SchedulingResult<DetectionReport> {
        range.validate(self.detector.config().max_range_days)?;

        let key = keys::detection(scope, range.start_date, range.end_date, threshold.value());
        if let Some(cache) = &self.cache {
            if let Some(report) = cache.get::<DetectionReport>(&key).await {
                return Ok(report);
            }
        }

        let report = self.detect_fresh(scope, range, threshold).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &report).await {
                warn!(error = %e, "Failed to cache detection result");
            }
        }
        Ok(report)
    }

    async fn detect_fresh(
        &self,
        scope: &TenantScope,
        range: &DateRange,
        threshold: ConfidenceThreshold,
    ) -> SchedulingResult<DetectionReport> {
        let (assignments, roster) = tokio::try_join!(
            self.store.fetch_assignments(scope, range),
            self.store.fetch_team_members(scope),
        )?;

        let mut conflicts = self.detector.detect(&assignments, &roster, range)?;
        let schedule = placed_slots(&assignments, range);
        for conflict in &mut conflicts {
            let mut candidates = self
                .generator
                .generate_in_schedule(conflict, &roster, &schedule)?;
            rank_resolutions(&mut candidates);
            conflict.suggested_resolutions = filter_by_confidence(candidates, threshold);
        }
        let summary = ConflictSummary::from_conflicts(&conflicts);

        Ok(DetectionReport {
            range: *range,
            confidence_threshold: threshold,
            conflicts,
            summary,
        })
    }

    /// Candidates for one conflict against the project's current roster.
    ///
    /// Slots missing from `conflict` are rebuilt from the store's current data.
    pub async fn resolutions(
        &self,
        scope: &TenantScope,
        conflict: &SchedulingConflict,
        threshold: ConfidenceThreshold,
    ) -> SchedulingResult<ResolutionCandidates> {
        let mut conflict = conflict.clone();
        if conflict.first_slot().is_none() && !conflict.affected_jobs.is_empty() {
            let known = self
                .store
                .fetch_assignments_by_installation(scope, &conflict.affected_jobs)
                .await?;
            conflict.slots = conflict
                .affected_jobs
                .iter()
                .filter_map(|job| {
                    known
                        .iter()
                        .filter(|a| &a.installation.id == job)
                        .find_map(slot_of)
                })
                .collect();
            debug!(
                conflict_id = %conflict.id,
                rebuilt = conflict.slots.len(),
                "Rebuilt conflict slots from the store"
            );
        }

        // The day after is included for next-day reschedules
        let schedule = match conflict.first_slot() {
            Some(first) => {
                let around = DateRange::new(first.date, first.date + chrono::Duration::days(1));
                let assignments = self.store.fetch_assignments(scope, &around).await?;
                placed_slots(&assignments, &around)
            }
            None => Vec::new(),
        };

        let roster = self.store.fetch_team_members(scope).await?;
        let mut candidates = self
            .generator
            .generate_in_schedule(&conflict, &roster, &schedule)?;
        rank_resolutions(&mut candidates);
        let total_candidates = candidates.len();

        Ok(ResolutionCandidates {
            resolutions: filter_by_confidence(candidates, threshold),
            total_candidates,
            confidence_threshold: threshold,
        })
    }

    pub async fn recommendations(&self, conflicts: &[SchedulingConflict]) -> Vec<AiRecommendation> {
        self.synthesizer.synthesize(conflicts).await
    }

    #[instrument(skip(self), fields(organization_id = %scope.organization_id, project_id = %scope.project_id))]
    pub async fn workload(
        &self,
        scope: &TenantScope,
        range: &DateRange,
    ) -> SchedulingResult<Vec<WorkloadSummary>> {
        range.validate(self.detector.config().max_range_days)?;

        let key = keys::workload(scope, range.start_date, range.end_date);
        if let Some(cache) = &self.cache {
            if let Some(summaries) = cache.get::<Vec<WorkloadSummary>>(&key).await {
                return Ok(summaries);
            }
        }

        let (assignments, roster) = tokio::try_join!(
            self.store.fetch_assignments(scope, range),
            self.store.fetch_team_members(scope),
        )?;
        let summaries = workload::aggregate(&assignments, &roster, range);

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &summaries).await {
                warn!(error = %e, "Failed to cache workload");
            }
        }
        Ok(summaries)
    }

    pub async fn apply(
        &self,
        scope: &TenantScope,
        resolutions: &mut [ConflictResolution],
        performed_by: &str,
    ) -> SchedulingResult<ApplyReport> {
        let report = self.applier.apply(scope, resolutions, performed_by).await?;
        if !report.applied.is_empty() {
            self.invalidate(scope).await;
        }
        Ok(report)
    }

    /// Detect afresh and apply the best eligible candidate of each conflict.
    ///
    /// Conflicts sharing a job with an earlier pick wait for the next pass, which
    /// detects again against the updated schedule. Stops when nothing is selected,
    /// nothing could be applied or the pass limit is reached.
    #[instrument(skip(self), fields(organization_id = %scope.organization_id, project_id = %scope.project_id))]
    pub async fn auto_resolve(
        &self,
        scope: &TenantScope,
        range: &DateRange,
        threshold: ConfidenceThreshold,
        performed_by: &str,
    ) -> SchedulingResult<AutoResolveReport> {
        range.validate(self.detector.config().max_range_days)?;

        let mut conflicts_detected = None;
        let mut conflicts_remaining;
        let mut passes = 0;
        let mut selected_all = Vec::new();
        let mut report = ApplyReport::default();

        loop {
            let detection = self.detect_fresh(scope, range, threshold).await?;
            conflicts_detected.get_or_insert(detection.conflicts.len());
            conflicts_remaining = detection.conflicts.len();
            if passes == AUTO_RESOLVE_MAX_PASSES {
                break;
            }

            let mut selected = select_auto_resolutions(&detection.conflicts, threshold);
            if selected.is_empty() {
                break;
            }
            passes += 1;

            let outcome = self.apply(scope, &mut selected, performed_by).await?;
            let progressed = !outcome.applied.is_empty();
            debug!(
                pass = passes,
                selected = selected.len(),
                applied = outcome.applied.len(),
                "Auto-resolve pass finished"
            );
            report.merge(outcome);
            selected_all.extend(selected);
            if !progressed {
                break;
            }
        }

        let conflicts_detected = conflicts_detected.unwrap_or_default();
        info!(
            conflicts = conflicts_detected,
            remaining = conflicts_remaining,
            passes,
            applied = report.applied.len(),
            "Auto-resolve finished"
        );

        Ok(AutoResolveReport {
            conflicts_detected,
            conflicts_remaining,
            passes,
            selected: selected_all,
            report,
        })
    }

    async fn invalidate(&self, scope: &TenantScope) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.delete_pattern(&keys::project_pattern(scope)).await {
                warn!(error = %e, "Failed to invalidate project cache");
            }
        }
    }
}
