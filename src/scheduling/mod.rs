//! Scheduling conflict engine.
//!
//! Detection, resolution generation and ranking are synchronous and pure over
//! their inputs. Only the applier and the optional recommendation scorer await.

pub mod applier;
pub mod detector;
pub mod error;
pub mod estimator;
pub mod interval;
pub mod ranking;
pub mod recommendations;
pub mod resolutions;
pub mod store;
pub mod summary;
pub mod workload;

#[cfg(test)]
pub(crate) mod test_support;

pub use applier::{ApplyReport, FailedResolution, ResolutionApplier};
pub use detector::{ConflictDetector, DetectionConfig};
pub use error::{DataAccessError, SchedulingError, SchedulingResult};
pub use estimator::{HeuristicImpactEstimator, ImpactEstimator};
pub use interval::DateRange;
pub use ranking::{filter_by_confidence, rank_resolutions, select_auto_resolutions, ConfidenceThreshold};
pub use recommendations::{RecommendationScore, RecommendationScorer, RecommendationSynthesizer};
pub use resolutions::ResolutionGenerator;
pub use store::{AppliedChange, SchedulingStore, TenantScope};
pub use summary::ConflictSummary;
pub use workload::WorkloadSummary;
