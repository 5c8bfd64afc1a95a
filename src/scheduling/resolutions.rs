//! Resolution candidates for a single conflict.

use chrono::{Duration, NaiveDate, NaiveTime};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::error::{SchedulingError, SchedulingResult};
use super::estimator::{HeuristicImpactEstimator, ImpactEstimator, ResolutionStrategy};
use super::interval::JobInterval;
use crate::domain::{
    AssignmentRole, ChangeDetail, ConflictResolution, ConflictType, ImpactLevel, JobSlot,
    ProposedChange, ResolutionImpact, ResolutionMethod, ResolutionStatus, SchedulingConflict,
    TeamMember,
};

/// Latest time of day a rescheduled job may finish
fn workday_end() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// `(date, start, end)` of a slot with the end clamped to its own date
fn slot_window(slot: &JobSlot) -> (NaiveDate, NaiveTime, NaiveTime) {
    let end = JobInterval::new(slot.date, slot.start_time, slot.duration_minutes)
        .map(|interval| interval.end_time_same_day())
        .unwrap_or(slot.start_time);
    (slot.date, slot.start_time, end)
}

/// Whether `a` and `b` have a team member in common
fn shares_member(a: &JobSlot, b: &JobSlot) -> bool {
    let members = |slot: &JobSlot| [Some(slot.lead_id), slot.assistant_id];
    members(a)
        .into_iter()
        .flatten()
        .any(|id| members(b).contains(&Some(id)))
}

/// Earliest start at or after `from` on `date` that clears every `busy` slot and
/// finishes by the end of the workday
fn first_free_start(
    date: NaiveDate,
    from: NaiveTime,
    duration_minutes: i32,
    busy: &[&JobSlot],
) -> Option<NaiveTime> {
    let length = Duration::minutes(i64::from(duration_minutes));
    let mut start = date.and_time(from);
    loop {
        let end = start + length;
        if end.date() != date || end.time() > workday_end() {
            return None;
        }
        let blocking_end = busy
            .iter()
            .filter(|slot| slot.start() < end && start < slot.end())
            .map(|slot| slot.end())
            .max();
        match blocking_end {
            Some(next) => start = next,
            None => return Some(start.time()),
        }
    }
}

/// Whether `member_id` has nothing else in `schedule` during `slot`
fn is_free_in(schedule: &[JobSlot], member_id: Uuid, slot: &JobSlot) -> bool {
    !schedule.iter().any(|other| {
        other.installation_id != slot.installation_id
            && other.role_of(member_id).is_some()
            && other.start() < slot.end()
            && slot.start() < other.end()
    })
}

/// Builds ranked resolution candidates, dispatching on conflict type
#[derive(Clone)]
pub struct ResolutionGenerator {
    estimator: Arc<dyn ImpactEstimator>,
}

impl Default for ResolutionGenerator {
    fn default() -> Self {
        Self::with_estimator(Arc::new(HeuristicImpactEstimator))
    }
}

impl ResolutionGenerator {
    pub fn with_estimator(estimator: Arc<dyn ImpactEstimator>) -> Self {
        Self { estimator }
    }

    /// Candidates for `conflict`, highest confidence first.
    ///
    /// Ties keep generation order. Every candidate proposes at least one change to
    /// the conflict's first affected job.
    pub fn generate(
        &self,
        conflict: &SchedulingConflict,
        team_members: &[TeamMember],
    ) -> SchedulingResult<Vec<ConflictResolution>> {
        self.generate_in_schedule(conflict, team_members, &[])
    }

    /// Like [`generate`](Self::generate), steering proposals clear of the other
    /// jobs placed in `schedule`
    pub fn generate_in_schedule(
        &self,
        conflict: &SchedulingConflict,
        team_members: &[TeamMember],
        schedule: &[JobSlot],
    ) -> SchedulingResult<Vec<ConflictResolution>> {
        let Some(first) = conflict.first_slot() else {
            let job = conflict.affected_jobs.first().ok_or_else(|| {
                SchedulingError::validation(format!("conflict {} has no affected jobs", conflict.id))
            })?;
            debug!(conflict_id = %conflict.id, "No slot for first affected job, manual review only");
            return Ok(vec![self.unscheduled_review(conflict, *job)]);
        };

        let mut resolutions = match conflict.conflict_type {
            ConflictType::TimeOverlap => self.for_overlap(conflict, first, team_members, schedule),
            ConflictType::CapacityExceeded => {
                vec![self.for_capacity(conflict, team_members, schedule)]
            }
            ConflictType::TravelDistance => {
                vec![self.for_travel(conflict, first, team_members, schedule)]
            }
            ConflictType::UnavailableTeam | ConflictType::Other => {
                vec![self.manual_reschedule(conflict, first)]
            }
        };

        resolutions.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        debug!(
            conflict_id = %conflict.id,
            conflict_type = %conflict.conflict_type,
            candidates = resolutions.len(),
            "Generated resolutions"
        );

        Ok(resolutions)
    }

    fn for_overlap(
        &self,
        conflict: &SchedulingConflict,
        first: &JobSlot,
        team_members: &[TeamMember],
        schedule: &[JobSlot],
    ) -> Vec<ConflictResolution> {
        let mut candidates = Vec::new();

        let busy: Vec<&JobSlot> = conflict
            .slots
            .iter()
            .chain(schedule)
            .filter(|slot| slot.installation_id != first.installation_id && shares_member(slot, first))
            .collect();
        let latest_end = conflict
            .slots
            .iter()
            .filter(|slot| slot.installation_id != first.installation_id)
            .map(JobSlot::end)
            .max()
            .unwrap_or_else(|| first.end());
        let same_day = (latest_end.date() == first.date)
            .then(|| first_free_start(first.date, latest_end.time(), first.duration_minutes, &busy))
            .flatten();
        let (proposed_date, proposed_time) = match same_day {
            Some(time) => (first.date, time),
            None => {
                let next_day = first.date + Duration::days(1);
                let time = first_free_start(next_day, first.start_time, first.duration_minutes, &busy)
                    .unwrap_or(first.start_time);
                (next_day, time)
            }
        };

        candidates.push(self.build(
            conflict,
            ResolutionStrategy::RescheduleOverlap,
            ResolutionMethod::Reschedule,
            format!(
                "Reschedule the first job to {} {} after the overlapping work",
                proposed_date,
                proposed_time.format("%H:%M")
            ),
            (ImpactLevel::Low, ImpactLevel::Low),
            vec![reschedule_change(
                first,
                proposed_date,
                proposed_time,
                "Removes the time overlap with the other job",
            )],
            false,
        ));

        if team_members.len() > 1 {
            let (role, current) = affected_role(conflict, first);
            if let Some(alternate) =
                pick_alternate(team_members, &conflict.affected_team_members, first, schedule)
            {
                candidates.push(self.build(
                    conflict,
                    ResolutionStrategy::ReassignOverlap,
                    ResolutionMethod::Reassign,
                    format!("Reassign the first job to {}", alternate.name),
                    (ImpactLevel::None, ImpactLevel::Low),
                    vec![reassign_change(
                        first,
                        role,
                        current,
                        Some(alternate.id),
                        "Alternate team member is free at this time",
                    )],
                    false,
                ));
            }
        }

        candidates
    }

    fn for_capacity(
        &self,
        conflict: &SchedulingConflict,
        team_members: &[TeamMember],
        schedule: &[JobSlot],
    ) -> ConflictResolution {
        let overloaded = conflict.affected_team_members.first().copied();
        let to_move = conflict.affected_jobs.len().div_ceil(2);
        let alternates: Vec<&TeamMember> = team_members
            .iter()
            .filter(|m| m.is_active && !conflict.affected_team_members.contains(&m.id))
            .collect();

        let mut changes = Vec::with_capacity(to_move);
        let mut cursor = 0usize;
        let mut unassigned = false;
        for job_id in conflict.affected_jobs.iter().take(to_move) {
            let Some(slot) = conflict.slots.iter().find(|s| &s.installation_id == job_id) else {
                continue;
            };
            let role = overloaded
                .and_then(|id| slot.role_of(id))
                .unwrap_or(AssignmentRole::Lead);
            let (date, start, end) = slot_window(slot);
            let pick = (0..alternates.len())
                .map(|offset| (cursor + offset) % alternates.len())
                .find(|&idx| {
                    alternates[idx].is_available(date, start, end)
                        && is_free_in(schedule, alternates[idx].id, slot)
                });
            let proposed = pick.map(|idx| {
                cursor = idx + 1;
                alternates[idx].id
            });
            unassigned |= proposed.is_none();
            changes.push(reassign_change(
                slot,
                role,
                overloaded,
                proposed,
                "Redistributes work away from an overloaded team member",
            ));
        }

        let mut resolution = self.build(
            conflict,
            ResolutionStrategy::RedistributeCapacity,
            ResolutionMethod::Reassign,
            format!(
                "Redistribute {} of {} jobs to other team members",
                changes.len(),
                conflict.affected_jobs.len()
            ),
            (ImpactLevel::None, ImpactLevel::Medium),
            changes,
            unassigned,
        );
        resolution.impact.affected_assignments = to_move as u32;
        resolution
    }

    fn for_travel(
        &self,
        conflict: &SchedulingConflict,
        first: &JobSlot,
        team_members: &[TeamMember],
        schedule: &[JobSlot],
    ) -> ConflictResolution {
        let (role, current) = affected_role(conflict, first);
        let alternate =
            pick_alternate(team_members, &conflict.affected_team_members, first, schedule);
        let description = match alternate {
            Some(member) => format!("Reassign the job to {} who is closer", member.name),
            None => "Reassign the job to a closer team member".to_string(),
        };

        self.build(
            conflict,
            ResolutionStrategy::ReassignCloserMember,
            ResolutionMethod::Reassign,
            description,
            (ImpactLevel::None, ImpactLevel::Low),
            vec![reassign_change(
                first,
                role,
                current,
                alternate.map(|m| m.id),
                "Shortens travel between consecutive jobs",
            )],
            alternate.is_none(),
        )
    }

    fn manual_reschedule(&self, conflict: &SchedulingConflict, first: &JobSlot) -> ConflictResolution {
        let proposed_date = first.date + Duration::days(1);
        self.build(
            conflict,
            ResolutionStrategy::ManualReschedule,
            ResolutionMethod::Reschedule,
            format!(
                "Reschedule to {} pending manual review",
                proposed_date
            ),
            (ImpactLevel::Medium, ImpactLevel::Low),
            vec![reschedule_change(
                first,
                proposed_date,
                first.start_time,
                "Conflict needs a scheduler's decision",
            )],
            true,
        )
    }

    /// Review-only candidate for a job whose slot is unknown. The assignment is
    /// unknown too, so the change carries a nil id and no replacement; the
    /// applier refuses it until both are filled in.
    fn unscheduled_review(&self, conflict: &SchedulingConflict, installation_id: Uuid) -> ConflictResolution {
        self.build(
            conflict,
            ResolutionStrategy::ManualReschedule,
            ResolutionMethod::Reassign,
            format!("Review job {} by hand; its schedule could not be loaded", installation_id),
            (ImpactLevel::Medium, ImpactLevel::Low),
            vec![ProposedChange {
                installation_id,
                assignment_id: Uuid::nil(),
                detail: ChangeDetail::Reassign {
                    role: AssignmentRole::Lead,
                    current_member_id: conflict.affected_team_members.first().copied(),
                    proposed_member_id: None,
                },
                reason: "Schedule of the affected job is unknown".to_string(),
            }],
            true,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        conflict: &SchedulingConflict,
        strategy: ResolutionStrategy,
        method: ResolutionMethod,
        description: String,
        (customer_impact, team_impact): (ImpactLevel, ImpactLevel),
        proposed_changes: Vec<ProposedChange>,
        requires_manual_review: bool,
    ) -> ConflictResolution {
        ConflictResolution {
            id: Uuid::new_v4(),
            conflict_id: conflict.id,
            method,
            description,
            confidence: self.estimator.estimate_confidence(conflict, strategy).min(100),
            impact: ResolutionImpact {
                affected_assignments: proposed_changes.len() as u32,
                customer_impact,
                team_impact,
                cost_impact: self.estimator.estimate_cost(conflict, strategy),
                time_impact_minutes: self.estimator.estimate_time(conflict, strategy),
            },
            proposed_changes,
            requires_manual_review,
            status: ResolutionStatus::Pending,
        }
    }
}

/// Role and id of the first affected member working `slot`
fn affected_role(conflict: &SchedulingConflict, slot: &JobSlot) -> (AssignmentRole, Option<Uuid>) {
    conflict
        .affected_team_members
        .iter()
        .find_map(|id| slot.role_of(*id).map(|role| (role, Some(*id))))
        .unwrap_or((AssignmentRole::Lead, Some(slot.lead_id)))
}

/// First active member outside `excluded` who is free for `slot`
fn pick_alternate<'a>(
    team_members: &'a [TeamMember],
    excluded: &[Uuid],
    slot: &JobSlot,
    schedule: &[JobSlot],
) -> Option<&'a TeamMember> {
    let (date, start, end) = slot_window(slot);
    team_members.iter().find(|m| {
        !excluded.contains(&m.id)
            && m.id != slot.lead_id
            && Some(m.id) != slot.assistant_id
            && m.is_available(date, start, end)
            && is_free_in(schedule, m.id, slot)
    })
}

fn reschedule_change(
    slot: &JobSlot,
    proposed_date: NaiveDate,
    proposed_time: NaiveTime,
    reason: &str,
) -> ProposedChange {
    ProposedChange {
        installation_id: slot.installation_id,
        assignment_id: slot.assignment_id,
        detail: ChangeDetail::Reschedule {
            current_date: Some(slot.date),
            current_time: Some(slot.start_time),
            proposed_date,
            proposed_time,
        },
        reason: reason.to_string(),
    }
}

fn reassign_change(
    slot: &JobSlot,
    role: AssignmentRole,
    current_member_id: Option<Uuid>,
    proposed_member_id: Option<Uuid>,
    reason: &str,
) -> ProposedChange {
    ProposedChange {
        installation_id: slot.installation_id,
        assignment_id: slot.assignment_id,
        detail: ChangeDetail::Reassign {
            role,
            current_member_id,
            proposed_member_id,
        },
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Assignment, ConflictSeverity, TeamMember};
    use crate::scheduling::detector::{placed_slots, slot_of, ConflictDetector};
    use crate::scheduling::interval::DateRange;
    use crate::scheduling::test_support::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn detect_one(assignments: &[Assignment], roster: &[TeamMember]) -> SchedulingConflict {
        let mut conflicts = ConflictDetector::default()
            .detect(assignments, roster, &DateRange::new(day(4), day(4)))
            .unwrap();
        assert_eq!(conflicts.len(), 1, "expected exactly one conflict");
        conflicts.remove(0)
    }

    fn overlap() -> SchedulingConflict {
        detect_one(
            &[
                assignment(1, 100, day(4), time(9, 0), 60),
                assignment(2, 100, day(4), time(9, 30), 60),
            ],
            &[],
        )
    }

    #[test]
    fn test_overlap_with_spare_members_offers_reschedule_then_reassign() {
        let conflict = overlap();
        let roster = vec![member(100), member(200), member(300)];

        let resolutions = ResolutionGenerator::default().generate(&conflict, &roster).unwrap();
        assert_eq!(resolutions.len(), 2);

        let reschedule = &resolutions[0];
        assert_eq!(reschedule.method, ResolutionMethod::Reschedule);
        assert_eq!(reschedule.confidence, 85);
        assert_eq!(reschedule.impact.time_impact_minutes, 15);
        assert_eq!(reschedule.impact.customer_impact, ImpactLevel::Low);
        assert_eq!(reschedule.impact.team_impact, ImpactLevel::Low);
        assert_eq!(reschedule.impact.cost_impact, Decimal::ZERO);
        assert_eq!(
            reschedule.proposed_changes[0].detail,
            ChangeDetail::Reschedule {
                current_date: Some(day(4)),
                current_time: Some(time(9, 0)),
                proposed_date: day(4),
                proposed_time: time(10, 30),
            }
        );

        let reassign = &resolutions[1];
        assert_eq!(reassign.method, ResolutionMethod::Reassign);
        assert_eq!(reassign.confidence, 78);
        assert_eq!(reassign.impact.time_impact_minutes, 10);
        assert_eq!(reassign.impact.customer_impact, ImpactLevel::None);
        assert_eq!(
            reassign.proposed_changes[0].detail,
            ChangeDetail::Reassign {
                role: AssignmentRole::Lead,
                current_member_id: Some(Uuid::from_u128(100)),
                proposed_member_id: Some(Uuid::from_u128(200)),
            }
        );
        assert_eq!(reassign.proposed_changes[0].installation_id, conflict.affected_jobs[0]);
    }

    #[test]
    fn test_overlap_with_single_member_only_reschedules() {
        let resolutions = ResolutionGenerator::default()
            .generate(&overlap(), &[member(100)])
            .unwrap();
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].method, ResolutionMethod::Reschedule);
    }

    #[test]
    fn test_late_overlap_moves_to_next_day() {
        let conflict = detect_one(
            &[
                assignment(1, 100, day(4), time(16, 0), 120),
                assignment(2, 100, day(4), time(17, 0), 60),
            ],
            &[],
        );
        let resolutions = ResolutionGenerator::default().generate(&conflict, &[]).unwrap();
        assert_eq!(resolutions[0].proposed_changes[0].proposed_value(), "2024-03-05 16:00");
    }

    #[test]
    fn test_capacity_redistributes_half_the_jobs() {
        let jobs: Vec<Assignment> = (0..5)
            .map(|i| assignment(10 + i, 100, day(4), time(7 + 2 * i as u32, 0), 120))
            .collect();
        let mut lead = member(100);
        lead.capacity_minutes = Some(480);
        let conflict = detect_one(&jobs, &[lead.clone()]);
        let roster = vec![lead, member(200), member(300)];

        let resolutions = ResolutionGenerator::default().generate(&conflict, &roster).unwrap();
        assert_eq!(resolutions.len(), 1);
        let redistribute = &resolutions[0];
        assert_eq!(redistribute.confidence, 92);
        assert_eq!(redistribute.impact.affected_assignments, 3);
        assert_eq!(redistribute.impact.customer_impact, ImpactLevel::None);
        assert_eq!(redistribute.impact.team_impact, ImpactLevel::Medium);
        assert_eq!(redistribute.proposed_changes.len(), 3);
        assert_eq!(redistribute.proposed_changes[0].installation_id, conflict.affected_jobs[0]);
        assert!(!redistribute.requires_manual_review);

        let targets: Vec<Option<Uuid>> = redistribute
            .proposed_changes
            .iter()
            .map(|change| match change.detail {
                ChangeDetail::Reassign { proposed_member_id, .. } => proposed_member_id,
                _ => None,
            })
            .collect();
        assert_eq!(
            targets,
            vec![
                Some(Uuid::from_u128(200)),
                Some(Uuid::from_u128(300)),
                Some(Uuid::from_u128(200))
            ]
        );
    }

    #[test]
    fn test_capacity_without_alternates_needs_review() {
        let jobs: Vec<Assignment> = (0..5)
            .map(|i| assignment(10 + i, 100, day(4), time(7 + 2 * i as u32, 0), 120))
            .collect();
        let conflict = detect_one(&jobs, &[]);
        let resolutions = ResolutionGenerator::default().generate(&conflict, &[]).unwrap();
        assert!(resolutions[0].requires_manual_review);
        assert_eq!(
            resolutions[0].proposed_changes[0].proposed_value(),
            "lead to be selected"
        );
    }

    #[test]
    fn test_travel_reassigns_with_savings() {
        let first = assignment(1, 100, day(4), time(9, 0), 60);
        let mut second = assignment(2, 100, day(4), time(12, 0), 60);
        second.estimated_travel_km = Some(80.0);
        let conflict = detect_one(&[first, second], &[]);

        let resolutions = ResolutionGenerator::default()
            .generate(&conflict, &[member(100), member(200)])
            .unwrap();
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].confidence, 88);
        assert_eq!(resolutions[0].impact.cost_impact, Decimal::new(-50, 0));
        assert_eq!(resolutions[0].impact.time_impact_minutes, -30);
        assert_eq!(resolutions[0].method, ResolutionMethod::Reassign);
    }

    #[test]
    fn test_unclassified_conflict_gets_manual_reschedule() {
        let mut conflict = overlap();
        conflict.conflict_type = ConflictType::Other;
        conflict.severity = ConflictSeverity::Low;

        let resolutions = ResolutionGenerator::default().generate(&conflict, &[]).unwrap();
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].confidence, 60);
        assert!(resolutions[0].requires_manual_review);
        assert_eq!(resolutions[0].method, ResolutionMethod::Reschedule);
    }

    fn without_slots(affected_jobs: Vec<Uuid>) -> SchedulingConflict {
        SchedulingConflict {
            id: Uuid::new_v4(),
            conflict_type: ConflictType::TimeOverlap,
            severity: ConflictSeverity::Medium,
            description: "hand-built".to_string(),
            affected_jobs,
            affected_team_members: vec![Uuid::from_u128(100)],
            slots: Vec::new(),
            date: None,
            detected_at: Utc::now(),
            auto_resolvable: true,
            impact_score: 30,
            suggested_resolutions: Vec::new(),
        }
    }

    #[test]
    fn test_conflict_without_slots_gets_review_candidate() {
        let job = Uuid::new_v4();
        let conflict = without_slots(vec![job]);

        let resolutions = ResolutionGenerator::default().generate(&conflict, &[]).unwrap();
        assert_eq!(resolutions.len(), 1);
        let review = &resolutions[0];
        assert!(review.requires_manual_review);
        assert_eq!(review.proposed_changes[0].installation_id, job);
        assert_eq!(review.proposed_changes[0].proposed_value(), "lead to be selected");
        assert_eq!(review.proposed_changes[0].current_value(), format!("lead {}", Uuid::from_u128(100)));
    }

    #[test]
    fn test_conflict_without_jobs_is_rejected() {
        assert!(matches!(
            ResolutionGenerator::default().generate(&without_slots(Vec::new()), &[]),
            Err(SchedulingError::Validation(_))
        ));
    }

    #[test]
    fn test_reschedule_skips_past_other_jobs_of_the_member() {
        let jobs = [
            assignment(1, 100, day(4), time(9, 0), 60),
            assignment(2, 100, day(4), time(9, 30), 60),
            assignment(3, 100, day(4), time(10, 15), 60),
        ];
        let range = DateRange::new(day(4), day(4));
        let conflicts = ConflictDetector::default().detect(&jobs, &[], &range).unwrap();
        let schedule = placed_slots(&jobs, &range);
        let first_pair = conflicts
            .iter()
            .find(|c| c.affected_jobs[0] == Uuid::from_u128(1))
            .unwrap();

        let resolutions = ResolutionGenerator::default()
            .generate_in_schedule(first_pair, &[], &schedule)
            .unwrap();
        assert_eq!(resolutions[0].proposed_changes[0].proposed_value(), "2024-03-04 11:15");
    }

    #[test]
    fn test_full_day_pushes_reschedule_to_next_free_slot() {
        let jobs = [
            assignment(1, 100, day(4), time(14, 0), 60),
            assignment(2, 100, day(4), time(14, 30), 240),
            assignment(3, 100, day(5), time(14, 0), 60),
        ];
        let conflict = detect_one(&jobs[..2], &[]);
        let schedule = placed_slots(&jobs, &DateRange::new(day(4), day(5)));

        let resolutions = ResolutionGenerator::default()
            .generate_in_schedule(&conflict, &[], &schedule)
            .unwrap();
        assert_eq!(resolutions[0].proposed_changes[0].proposed_value(), "2024-03-05 15:00");
    }

    #[test]
    fn test_busy_alternate_is_not_offered() {
        let conflict = overlap();
        let schedule = vec![slot_of(&assignment(9, 200, day(4), time(8, 30), 120)).unwrap()];

        let resolutions = ResolutionGenerator::default()
            .generate_in_schedule(&conflict, &[member(100), member(200), member(300)], &schedule)
            .unwrap();
        let reassign = resolutions
            .iter()
            .find(|r| r.method == ResolutionMethod::Reassign)
            .unwrap();
        assert_eq!(
            reassign.proposed_changes[0].proposed_value(),
            format!("lead {}", Uuid::from_u128(300))
        );
    }

    struct InvertedEstimator;

    impl ImpactEstimator for InvertedEstimator {
        fn estimate_confidence(&self, _: &SchedulingConflict, strategy: ResolutionStrategy) -> u8 {
            match strategy {
                ResolutionStrategy::ReassignOverlap => 250,
                _ => 10,
            }
        }

        fn estimate_cost(&self, _: &SchedulingConflict, _: ResolutionStrategy) -> Decimal {
            Decimal::ONE
        }

        fn estimate_time(&self, _: &SchedulingConflict, _: ResolutionStrategy) -> i32 {
            1
        }
    }

    #[test]
    fn test_custom_estimator_is_clamped_and_reorders() {
        let generator = ResolutionGenerator::with_estimator(Arc::new(InvertedEstimator));
        let resolutions = generator
            .generate(&overlap(), &[member(100), member(200)])
            .unwrap();
        assert_eq!(resolutions[0].method, ResolutionMethod::Reassign);
        assert_eq!(resolutions[0].confidence, 100);
        assert_eq!(resolutions[1].confidence, 10);
    }

    #[test]
    fn test_output_is_non_increasing_in_confidence() {
        let roster = vec![member(100), member(200)];
        let generator = ResolutionGenerator::default();
        for kind in [
            ConflictType::TimeOverlap,
            ConflictType::CapacityExceeded,
            ConflictType::TravelDistance,
            ConflictType::UnavailableTeam,
            ConflictType::Other,
        ] {
            let mut conflict = overlap();
            conflict.conflict_type = kind;
            let resolutions = generator.generate(&conflict, &roster).unwrap();
            assert!(!resolutions.is_empty());
            assert!(resolutions
                .windows(2)
                .all(|pair| pair[0].confidence >= pair[1].confidence));
            for resolution in &resolutions {
                assert!(resolution.confidence <= 100);
                assert_eq!(resolution.conflict_id, conflict.id);
                assert!(resolution
                    .proposed_changes
                    .iter()
                    .any(|c| c.installation_id == conflict.affected_jobs[0]));
            }
        }
    }
}
