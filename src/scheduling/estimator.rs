//! Confidence and impact estimation for resolution candidates.
//!
//! The heuristic estimator returns fixed figures per strategy. More specific
//! conflict types carry higher baseline confidence; replacement estimators must
//! keep that ordering.

use rust_decimal::Decimal;

use crate::domain::SchedulingConflict;

/// Concrete strategy behind a resolution candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStrategy {
    /// Move the first overlapping job after the jobs it collides with
    RescheduleOverlap,
    /// Hand the first overlapping job to another member
    ReassignOverlap,
    /// Move roughly half of an overloaded member's jobs to others
    RedistributeCapacity,
    /// Hand a far-away job to a member with a shorter trip
    ReassignCloserMember,
    /// Push the job to another day pending a human decision
    ManualReschedule,
}

pub trait ImpactEstimator: Send + Sync {
    /// Confidence 0-100 that the strategy resolves the conflict
    fn estimate_confidence(&self, conflict: &SchedulingConflict, strategy: ResolutionStrategy)
        -> u8;

    /// Signed currency delta; negative is a saving
    fn estimate_cost(&self, conflict: &SchedulingConflict, strategy: ResolutionStrategy)
        -> Decimal;

    /// Signed minutes delta; negative is a saving
    fn estimate_time(&self, conflict: &SchedulingConflict, strategy: ResolutionStrategy) -> i32;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicImpactEstimator;

impl ImpactEstimator for HeuristicImpactEstimator {
    fn estimate_confidence(&self, _: &SchedulingConflict, strategy: ResolutionStrategy) -> u8 {
        match strategy {
            ResolutionStrategy::RedistributeCapacity => 92,
            ResolutionStrategy::ReassignCloserMember => 88,
            ResolutionStrategy::RescheduleOverlap => 85,
            ResolutionStrategy::ReassignOverlap => 78,
            ResolutionStrategy::ManualReschedule => 60,
        }
    }

    fn estimate_cost(&self, _: &SchedulingConflict, strategy: ResolutionStrategy) -> Decimal {
        match strategy {
            ResolutionStrategy::ReassignCloserMember => Decimal::new(-50, 0),
            _ => Decimal::ZERO,
        }
    }

    fn estimate_time(&self, _: &SchedulingConflict, strategy: ResolutionStrategy) -> i32 {
        match strategy {
            ResolutionStrategy::RescheduleOverlap => 15,
            ResolutionStrategy::ReassignOverlap => 10,
            ResolutionStrategy::ReassignCloserMember => -30,
            ResolutionStrategy::RedistributeCapacity | ResolutionStrategy::ManualReschedule => 0,
        }
    }
}
