//! Scheduling conflict and resolution types
//!
//! Conflicts and resolutions are derived artifacts: they are recomputed from the
//! current assignment snapshot and never act as the system of record.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::assignments::AssignmentRole;
use super::installations::InstallationPriority;

/// Kind of scheduling problem
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    TimeOverlap,
    CapacityExceeded,
    TravelDistance,
    UnavailableTeam,
    #[serde(other)]
    Other,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeOverlap => "time_overlap",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::TravelDistance => "travel_distance",
            Self::UnavailableTeam => "unavailable_team",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conflict severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConflictSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Calendar placement of one affected job, captured at detection time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSlot {
    pub installation_id: Uuid,
    pub assignment_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub lead_id: Uuid,
    #[serde(default)]
    pub assistant_id: Option<Uuid>,
    #[serde(default)]
    pub priority: InstallationPriority,
}

impl JobSlot {
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn end(&self) -> NaiveDateTime {
        self.start() + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn role_of(&self, member_id: Uuid) -> Option<AssignmentRole> {
        if self.lead_id == member_id {
            Some(AssignmentRole::Lead)
        } else if self.assistant_id == Some(member_id) {
            Some(AssignmentRole::Assistant)
        } else {
            None
        }
    }
}

/// A detected scheduling problem
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulingConflict {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub description: String,
    pub affected_jobs: Vec<Uuid>,
    pub affected_team_members: Vec<Uuid>,
    /// Slots of the affected jobs, in `affected_jobs` order
    #[serde(default)]
    pub slots: Vec<JobSlot>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub detected_at: DateTime<Utc>,
    pub auto_resolvable: bool,
    pub impact_score: u8,
    #[serde(default)]
    pub suggested_resolutions: Vec<ConflictResolution>,
}

impl SchedulingConflict {
    pub fn first_slot(&self) -> Option<&JobSlot> {
        let first = self.affected_jobs.first()?;
        self.slots.iter().find(|slot| &slot.installation_id == first)
    }
}

/// Corrective action family
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Reschedule,
    Reassign,
    Split,
    Cancel,
    Modify,
}

/// Qualitative impact on customers or the team
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    None,
    Low,
    Medium,
    High,
}

/// Lifecycle of a single resolution candidate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Pending,
    Applied,
    Discarded,
}

impl Default for ResolutionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Applied => f.write_str("applied"),
            Self::Discarded => f.write_str("discarded"),
        }
    }
}

/// Estimated consequences of applying a resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionImpact {
    pub affected_assignments: u32,
    pub customer_impact: ImpactLevel,
    pub team_impact: ImpactLevel,
    /// Signed currency delta; negative values are savings
    pub cost_impact: Decimal,
    /// Signed minutes delta; negative values are savings
    pub time_impact_minutes: i32,
}

/// Field-level change carried by a proposed change, keyed by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeDetail {
    Reschedule {
        #[serde(default)]
        current_date: Option<NaiveDate>,
        #[serde(default)]
        current_time: Option<NaiveTime>,
        proposed_date: NaiveDate,
        proposed_time: NaiveTime,
    },
    Reassign {
        role: AssignmentRole,
        #[serde(default)]
        current_member_id: Option<Uuid>,
        /// `None` until somebody picks a replacement
        #[serde(default)]
        proposed_member_id: Option<Uuid>,
    },
    Modify {
        #[serde(default)]
        current_duration_minutes: Option<i32>,
        proposed_duration_minutes: i32,
    },
}

/// One field-level change against an installation/assignment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposedChange {
    pub installation_id: Uuid,
    pub assignment_id: Uuid,
    #[serde(flatten)]
    pub detail: ChangeDetail,
    pub reason: String,
}

impl ProposedChange {
    /// Human-readable value before the change
    pub fn current_value(&self) -> String {
        match &self.detail {
            ChangeDetail::Reschedule {
                current_date,
                current_time,
                ..
            } => match (current_date, current_time) {
                (Some(date), Some(time)) => format!("{} {}", date, time.format("%H:%M")),
                (Some(date), None) => date.to_string(),
                _ => "unscheduled".to_string(),
            },
            ChangeDetail::Reassign {
                role,
                current_member_id,
                ..
            } => match current_member_id {
                Some(id) => format!("{} {}", role, id),
                None => format!("no {}", role),
            },
            ChangeDetail::Modify {
                current_duration_minutes,
                ..
            } => match current_duration_minutes {
                Some(minutes) => format!("{} min", minutes),
                None => "default duration".to_string(),
            },
        }
    }

    /// Human-readable value after the change
    pub fn proposed_value(&self) -> String {
        match &self.detail {
            ChangeDetail::Reschedule {
                proposed_date,
                proposed_time,
                ..
            } => format!("{} {}", proposed_date, proposed_time.format("%H:%M")),
            ChangeDetail::Reassign {
                role,
                proposed_member_id,
                ..
            } => match proposed_member_id {
                Some(id) => format!("{} {}", role, id),
                None => format!("{} to be selected", role),
            },
            ChangeDetail::Modify {
                proposed_duration_minutes,
                ..
            } => format!("{} min", proposed_duration_minutes),
        }
    }
}

/// A candidate fix for one conflict
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictResolution {
    pub id: Uuid,
    pub conflict_id: Uuid,
    #[serde(rename = "type")]
    pub method: ResolutionMethod,
    pub description: String,
    pub confidence: u8,
    pub impact: ResolutionImpact,
    pub proposed_changes: Vec<ProposedChange>,
    #[serde(default)]
    pub requires_manual_review: bool,
    #[serde(default)]
    pub status: ResolutionStatus,
}
