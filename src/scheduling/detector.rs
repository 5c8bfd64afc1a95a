//! Conflict detection over an assignment snapshot.
//!
//! Overlaps are found with a pairwise scan per team member. That is quadratic in
//! a member's daily job count, which stays small (bounded by capacity); a
//! sweep-line over start times would be the next step if that stops holding.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::error::SchedulingResult;
use super::interval::{place, DateRange, JobInterval};
use super::workload::{self, WorkloadSummary};
use crate::domain::{
    Assignment, ConflictSeverity, ConflictType, InstallationPriority, JobSlot,
    SchedulingConflict, TeamMember,
};

/// Thresholds applied by the detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub travel_time_threshold_minutes: i32,
    pub travel_distance_threshold_km: f64,
    pub max_range_days: i64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            travel_time_threshold_minutes: 45,
            travel_distance_threshold_km: 50.0,
            max_range_days: 93,
        }
    }
}

/// An assignment that made it onto the calendar
#[derive(Clone, Copy)]
struct Placed<'a> {
    assignment: &'a Assignment,
    interval: JobInterval,
}

impl Placed<'_> {
    fn installation_id(&self) -> Uuid {
        self.assignment.installation.id
    }

    fn date(&self) -> NaiveDate {
        self.interval.start.date()
    }

    fn label(&self) -> &str {
        &self.assignment.installation.customer_name
    }

    fn slot(&self) -> JobSlot {
        JobSlot {
            installation_id: self.installation_id(),
            assignment_id: self.assignment.id,
            date: self.date(),
            start_time: self.interval.start.time(),
            duration_minutes: self.interval.minutes() as i32,
            lead_id: self.assignment.lead_id,
            assistant_id: self.assignment.assistant_id,
            priority: self.assignment.installation.priority,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    config: DetectionConfig,
}

impl ConflictDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect every conflict among `assignments` inside `range`.
    ///
    /// Records that cannot be placed on the calendar are skipped rather than
    /// reported. Output lists overlaps, capacity, travel and availability
    /// conflicts in that order, each deterministic for a given input order.
    #[instrument(skip_all, fields(assignments = assignments.len(), roster = roster.len()))]
    pub fn detect(
        &self,
        assignments: &[Assignment],
        roster: &[TeamMember],
        range: &DateRange,
    ) -> SchedulingResult<Vec<SchedulingConflict>> {
        range.validate(self.config.max_range_days)?;

        let placed: Vec<Placed<'_>> = assignments
            .iter()
            .filter_map(|assignment| {
                place(assignment, range).map(|interval| Placed {
                    assignment,
                    interval,
                })
            })
            .collect();
        let skipped = assignments.len() - placed.len();
        if skipped > 0 {
            debug!(skipped, "Skipped assignments that could not be placed in range");
        }

        let groups = group_by_member(&placed);
        let workloads = workload::aggregate(assignments, roster, range);

        let mut conflicts = Vec::new();
        conflicts.extend(detect_overlaps(&groups));
        conflicts.extend(detect_capacity(&workloads, &placed, roster));
        conflicts.extend(self.detect_travel(&groups));
        conflicts.extend(detect_unavailable(&placed, roster));

        info!(
            conflicts = conflicts.len(),
            placed = placed.len(),
            start_date = %range.start_date,
            end_date = %range.end_date,
            "Conflict detection finished"
        );

        Ok(conflicts)
    }

    fn detect_travel(&self, groups: &[(Uuid, Vec<Placed<'_>>)]) -> Vec<SchedulingConflict> {
        let max_minutes = self.config.travel_time_threshold_minutes;
        let max_km = self.config.travel_distance_threshold_km;
        let mut conflicts: Vec<SchedulingConflict> = Vec::new();
        let mut seen: HashMap<(Uuid, Uuid), usize> = HashMap::new();

        for (member_id, jobs) in groups {
            let mut ordered = jobs.clone();
            ordered.sort_by_key(|job| job.interval.start);

            for pair in ordered.windows(2) {
                let (prev, next) = (pair[0], pair[1]);
                if prev.date() != next.date() || prev.installation_id() == next.installation_id() {
                    continue;
                }
                let minutes = next.assignment.estimated_travel_minutes.unwrap_or(0);
                let km = next.assignment.estimated_travel_km.unwrap_or(0.0);
                if minutes <= max_minutes && km <= max_km {
                    continue;
                }

                let key = (prev.installation_id(), next.installation_id());
                if let Some(&idx) = seen.get(&key) {
                    add_member(&mut conflicts[idx], *member_id);
                    continue;
                }

                let severity = if minutes > 2 * max_minutes || km > 2.0 * max_km {
                    ConflictSeverity::High
                } else {
                    ConflictSeverity::Medium
                };
                let slots = vec![prev.slot(), next.slot()];
                seen.insert(key, conflicts.len());
                conflicts.push(new_conflict(
                    ConflictType::TravelDistance,
                    severity,
                    format!(
                        "Travel from {} to {} on {} needs {} min / {:.1} km (limits {} min / {:.1} km)",
                        prev.label(),
                        next.label(),
                        next.date(),
                        minutes,
                        km,
                        max_minutes,
                        max_km
                    ),
                    slots,
                    vec![*member_id],
                    true,
                ));
            }
        }

        conflicts
    }
}

/// Calendar slots of every assignment live inside `range`
pub fn placed_slots(assignments: &[Assignment], range: &DateRange) -> Vec<JobSlot> {
    assignments
        .iter()
        .filter_map(|assignment| {
            place(assignment, range).map(|interval| Placed { assignment, interval }.slot())
        })
        .collect()
}

/// Slot of a single live assignment, whatever its date
pub fn slot_of(assignment: &Assignment) -> Option<JobSlot> {
    let date = assignment.installation.scheduled_date?;
    placed_slots(std::slice::from_ref(assignment), &DateRange::new(date, date)).pop()
}

/// Placed jobs per member (lead or assistant), in order of first appearance
fn group_by_member<'a>(placed: &[Placed<'a>]) -> Vec<(Uuid, Vec<Placed<'a>>)> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut groups: Vec<(Uuid, Vec<Placed<'a>>)> = Vec::new();

    for job in placed {
        for (member_id, _) in job.assignment.members() {
            let idx = *index.entry(member_id).or_insert_with(|| {
                groups.push((member_id, Vec::new()));
                groups.len() - 1
            });
            groups[idx].1.push(*job);
        }
    }

    groups
}

fn detect_overlaps(groups: &[(Uuid, Vec<Placed<'_>>)]) -> Vec<SchedulingConflict> {
    let mut conflicts: Vec<SchedulingConflict> = Vec::new();
    let mut seen: HashMap<(Uuid, Uuid), usize> = HashMap::new();

    for (member_id, jobs) in groups {
        for (i, a) in jobs.iter().enumerate() {
            for b in &jobs[i + 1..] {
                if a.installation_id() == b.installation_id() || !a.interval.overlaps(&b.interval)
                {
                    continue;
                }

                let key = (a.installation_id(), b.installation_id());
                if let Some(&idx) = seen.get(&key) {
                    add_member(&mut conflicts[idx], *member_id);
                    continue;
                }

                seen.insert(key, conflicts.len());
                conflicts.push(new_conflict(
                    ConflictType::TimeOverlap,
                    ConflictSeverity::Medium,
                    format!(
                        "{} ({}) overlaps {} ({}) on {}",
                        a.label(),
                        a.interval.start.time().format("%H:%M"),
                        b.label(),
                        b.interval.start.time().format("%H:%M"),
                        a.date()
                    ),
                    vec![a.slot(), b.slot()],
                    vec![*member_id],
                    true,
                ));
            }
        }
    }

    conflicts
}

fn detect_capacity(
    workloads: &[WorkloadSummary],
    placed: &[Placed<'_>],
    roster: &[TeamMember],
) -> Vec<SchedulingConflict> {
    let by_assignment: HashMap<Uuid, &Placed<'_>> =
        placed.iter().map(|job| (job.assignment.id, job)).collect();
    let members: HashMap<Uuid, &TeamMember> = roster.iter().map(|m| (m.id, m)).collect();

    workloads
        .iter()
        .filter_map(|summary| {
            let max_jobs = members
                .get(&summary.team_member_id)
                .and_then(|m| m.preferences.max_daily_jobs);
            let too_many_jobs = max_jobs.is_some_and(|max| summary.job_count > max);
            if !summary.is_overloaded() && !too_many_jobs {
                return None;
            }

            let severity = if summary.utilization_percent >= 150.0 {
                ConflictSeverity::Critical
            } else if summary.utilization_percent >= 125.0 {
                ConflictSeverity::High
            } else {
                ConflictSeverity::Medium
            };
            let slots: Vec<JobSlot> = summary
                .assignment_ids
                .iter()
                .filter_map(|id| by_assignment.get(id).map(|job| job.slot()))
                .collect();

            let name = members
                .get(&summary.team_member_id)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| summary.team_member_id.to_string());

            Some(new_conflict(
                ConflictType::CapacityExceeded,
                severity,
                format!(
                    "{} is at {:.0}% of capacity on {} ({} of {} minutes across {} jobs)",
                    name,
                    summary.utilization_percent,
                    summary.date,
                    summary.assigned_minutes,
                    summary.capacity_minutes,
                    summary.job_count
                ),
                slots,
                vec![summary.team_member_id],
                true,
            ))
        })
        .collect()
}

fn detect_unavailable(placed: &[Placed<'_>], roster: &[TeamMember]) -> Vec<SchedulingConflict> {
    let members: HashMap<Uuid, &TeamMember> = roster.iter().map(|m| (m.id, m)).collect();
    let mut conflicts = Vec::new();

    for job in placed {
        for (member_id, role) in job.assignment.members() {
            let Some(member) = members.get(&member_id) else {
                continue;
            };
            let start = job.interval.start.time();
            let end = job.interval.end_time_same_day();
            if let Err(reason) = member.check_availability(job.date(), start, end) {
                conflicts.push(new_conflict(
                    ConflictType::UnavailableTeam,
                    ConflictSeverity::Critical,
                    format!(
                        "{} ({}) {} for {} on {} at {}",
                        member.name,
                        role,
                        reason.describe(),
                        job.label(),
                        job.date(),
                        start.format("%H:%M")
                    ),
                    vec![job.slot()],
                    vec![member_id],
                    false,
                ));
            }
        }
    }

    conflicts
}

fn add_member(conflict: &mut SchedulingConflict, member_id: Uuid) {
    if !conflict.affected_team_members.contains(&member_id) {
        conflict.affected_team_members.push(member_id);
    }
}

fn new_conflict(
    conflict_type: ConflictType,
    severity: ConflictSeverity,
    description: String,
    slots: Vec<JobSlot>,
    team_members: Vec<Uuid>,
    auto_resolvable: bool,
) -> SchedulingConflict {
    SchedulingConflict {
        id: Uuid::new_v4(),
        conflict_type,
        severity,
        description,
        affected_jobs: slots.iter().map(|slot| slot.installation_id).collect(),
        affected_team_members: team_members,
        date: slots.first().map(|slot| slot.date),
        detected_at: Utc::now(),
        auto_resolvable,
        impact_score: impact_score(severity, &slots),
        slots,
        suggested_resolutions: Vec::new(),
    }
}

/// Score 0-100 from severity, number of jobs hit and their priority
pub fn impact_score(severity: ConflictSeverity, slots: &[JobSlot]) -> u8 {
    let base: u32 = match severity {
        ConflictSeverity::Low => 10,
        ConflictSeverity::Medium => 30,
        ConflictSeverity::High => 55,
        ConflictSeverity::Critical => 80,
    };
    let breadth = (slots.len().saturating_sub(1) as u32 * 5).min(15);
    let priority = match slots.iter().map(|slot| slot.priority).max() {
        Some(InstallationPriority::Urgent) => 15,
        Some(InstallationPriority::High) => 10,
        Some(InstallationPriority::Medium) => 5,
        _ => 0,
    };
    (base + breadth + priority).min(100) as u8
}
