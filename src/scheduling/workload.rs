//! Per-member daily workload aggregation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use super::interval::{place, DateRange};
use crate::domain::{Assignment, TeamMember};

/// Daily capacity assumed when the member has none on record (8 hours)
pub const DEFAULT_CAPACITY_MINUTES: i64 = 480;

const OVERLOADED_ABOVE: f64 = 100.0;
const CRITICAL_ABOVE: f64 = 90.0;
const UNDERUTILIZED_BELOW: f64 = 60.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    Underutilized,
    Optimal,
    Critical,
    Overloaded,
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Underutilized => "underutilized",
            Self::Optimal => "optimal",
            Self::Critical => "critical",
            Self::Overloaded => "overloaded",
        };
        f.write_str(label)
    }
}

/// Utilization of one capacity figure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utilization {
    pub percent: f64,
    pub status: WorkloadStatus,
    pub overtime_minutes: i64,
}

impl Utilization {
    pub fn compute(assigned_minutes: i64, capacity_minutes: i64) -> Self {
        let capacity = if capacity_minutes > 0 {
            capacity_minutes
        } else {
            DEFAULT_CAPACITY_MINUTES
        };
        let percent = assigned_minutes as f64 / capacity as f64 * 100.0;
        let status = if percent > OVERLOADED_ABOVE {
            WorkloadStatus::Overloaded
        } else if percent > CRITICAL_ABOVE {
            WorkloadStatus::Critical
        } else if percent < UNDERUTILIZED_BELOW {
            WorkloadStatus::Underutilized
        } else {
            WorkloadStatus::Optimal
        };
        let overtime_minutes = if status == WorkloadStatus::Overloaded {
            assigned_minutes - capacity
        } else {
            0
        };
        Self {
            percent,
            status,
            overtime_minutes,
        }
    }
}

/// Workload of one member on one date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkloadSummary {
    pub team_member_id: Uuid,
    pub date: NaiveDate,
    pub assigned_minutes: i64,
    pub travel_minutes: i64,
    pub buffer_minutes: i64,
    pub capacity_minutes: i64,
    pub job_count: u32,
    pub utilization_percent: f64,
    pub status: WorkloadStatus,
    pub overtime_minutes: i64,
    /// Installations counted, in input order
    pub installation_ids: Vec<Uuid>,
    /// Assignments counted, parallel to `installation_ids`
    pub assignment_ids: Vec<Uuid>,
}

impl WorkloadSummary {
    pub fn overtime_hours(&self) -> f64 {
        self.overtime_minutes as f64 / 60.0
    }

    pub fn is_overloaded(&self) -> bool {
        self.status == WorkloadStatus::Overloaded
    }
}

/// Capacity in minutes for a member, defaulting when unknown
pub fn capacity_for(member: Option<&TeamMember>) -> i64 {
    member
        .and_then(|m| m.capacity_minutes)
        .filter(|minutes| *minutes > 0)
        .map(i64::from)
        .unwrap_or(DEFAULT_CAPACITY_MINUTES)
}

/// Aggregate workloads for every member/date touched by `assignments` inside `range`.
///
/// Each job counts its duration plus estimated travel and buffer time for both the
/// lead and the assistant. Output is ordered by date, then by first appearance.
pub fn aggregate(
    assignments: &[Assignment],
    roster: &[TeamMember],
    range: &DateRange,
) -> Vec<WorkloadSummary> {
    let members: HashMap<Uuid, &TeamMember> = roster.iter().map(|m| (m.id, m)).collect();
    let mut index: HashMap<(Uuid, NaiveDate), usize> = HashMap::new();
    let mut summaries: Vec<WorkloadSummary> = Vec::new();

    for assignment in assignments {
        let Some(interval) = place(assignment, range) else {
            continue;
        };
        let date = interval.start.date();
        let travel = i64::from(assignment.estimated_travel_minutes.unwrap_or(0).max(0));
        let buffer = i64::from(assignment.buffer_minutes.unwrap_or(0).max(0));

        for (member_id, _) in assignment.members() {
            let slot = *index.entry((member_id, date)).or_insert_with(|| {
                summaries.push(WorkloadSummary {
                    team_member_id: member_id,
                    date,
                    assigned_minutes: 0,
                    travel_minutes: 0,
                    buffer_minutes: 0,
                    capacity_minutes: capacity_for(members.get(&member_id).copied()),
                    job_count: 0,
                    utilization_percent: 0.0,
                    status: WorkloadStatus::Underutilized,
                    overtime_minutes: 0,
                    installation_ids: Vec::new(),
                    assignment_ids: Vec::new(),
                });
                summaries.len() - 1
            });
            let summary = &mut summaries[slot];
            summary.assigned_minutes += interval.minutes() + travel + buffer;
            summary.travel_minutes += travel;
            summary.buffer_minutes += buffer;
            summary.job_count += 1;
            summary.installation_ids.push(assignment.installation.id);
            summary.assignment_ids.push(assignment.id);
        }
    }

    for summary in &mut summaries {
        let utilization = Utilization::compute(summary.assigned_minutes, summary.capacity_minutes);
        summary.utilization_percent = utilization.percent;
        summary.status = utilization.status;
        summary.overtime_minutes = utilization.overtime_minutes;
    }

    summaries.sort_by_key(|s| s.date);
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::test_support::*;

    #[test]
    fn test_overloaded_math() {
        let utilization = Utilization::compute(600, 480);
        assert_eq!(utilization.percent, 125.0);
        assert_eq!(utilization.status, WorkloadStatus::Overloaded);
        assert_eq!(utilization.overtime_minutes, 120);
    }

    #[test]
    fn test_status_bands() {
        assert_eq!(Utilization::compute(480, 480).status, WorkloadStatus::Critical);
        assert_eq!(Utilization::compute(440, 480).status, WorkloadStatus::Critical);
        assert_eq!(Utilization::compute(432, 480).status, WorkloadStatus::Optimal);
        assert_eq!(Utilization::compute(288, 480).status, WorkloadStatus::Optimal);
        assert_eq!(Utilization::compute(240, 480).status, WorkloadStatus::Underutilized);
        assert_eq!(Utilization::compute(480, 480).overtime_minutes, 0);
    }

    #[test]
    fn test_zero_capacity_falls_back_to_default() {
        assert_eq!(Utilization::compute(240, 0).percent, 50.0);
    }

    #[test]
    fn test_five_two_hour_jobs_overload_one_member() {
        let range = DateRange::new(day(4), day(4));
        let assignments: Vec<Assignment> = (0..5)
            .map(|i| assignment(10 + i, 1, day(4), time(7 + 2 * i as u32, 0), 120))
            .collect();
        let mut lead = member(1);
        lead.capacity_minutes = Some(480);

        let summaries = aggregate(&assignments, &[lead], &range);
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.assigned_minutes, 600);
        assert_eq!(summary.job_count, 5);
        assert_eq!(summary.utilization_percent, 125.0);
        assert!(summary.is_overloaded());
        assert_eq!(summary.overtime_hours(), 2.0);
    }

    #[test]
    fn test_travel_buffer_and_assistant_are_counted() {
        let range = DateRange::new(day(4), day(4));
        let mut job = assignment(10, 1, day(4), time(9, 0), 60);
        job.assistant_id = Some(uuid::Uuid::from_u128(2));
        job.estimated_travel_minutes = Some(30);
        job.buffer_minutes = Some(15);

        let summaries = aggregate(&[job], &[], &range);
        assert_eq!(summaries.len(), 2);
        for summary in &summaries {
            assert_eq!(summary.assigned_minutes, 105);
            assert_eq!(summary.travel_minutes, 30);
            assert_eq!(summary.capacity_minutes, DEFAULT_CAPACITY_MINUTES);
        }
    }

    #[test]
    fn test_missing_duration_uses_default() {
        let range = DateRange::new(day(4), day(4));
        let mut job = assignment(10, 1, day(4), time(9, 0), 60);
        job.installation.duration_minutes = None;

        let summaries = aggregate(&[job], &[], &range);
        assert_eq!(summaries[0].assigned_minutes, 120);
    }

    #[test]
    fn test_out_of_range_and_unscheduled_records_are_skipped() {
        let range = DateRange::new(day(4), day(4));
        let other_day = assignment(10, 1, day(5), time(9, 0), 60);
        let mut unscheduled = assignment(11, 1, day(4), time(9, 0), 60);
        unscheduled.installation.scheduled_time = None;

        assert!(aggregate(&[other_day, unscheduled], &[], &range).is_empty());
    }

    #[test]
    fn test_summaries_ordered_by_date() {
        let range = DateRange::new(day(4), day(6));
        let later = assignment(10, 1, day(6), time(9, 0), 60);
        let earlier = assignment(11, 1, day(4), time(9, 0), 60);

        let summaries = aggregate(&[later, earlier], &[], &range);
        assert_eq!(summaries[0].date, day(4));
        assert_eq!(summaries[1].date, day(6));
    }
}
