//! Assignment domain types
//!
//! An assignment binds an installation to a lead and an optional assistant and
//! carries the travel/buffer estimates that feed workload calculations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::installations::Installation;

/// Assignment status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    Accepted,
    Declined,
    Completed,
}

impl Default for AssignmentStatus {
    fn default() -> Self {
        Self::Assigned
    }
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Completed => "completed",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "accepted" => Self::Accepted,
            "declined" => Self::Declined,
            "completed" => Self::Completed,
            _ => Self::Assigned,
        }
    }
}

/// Role a team member plays on an installation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentRole {
    Lead,
    Assistant,
}

impl fmt::Display for AssignmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lead => f.write_str("lead"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

/// Action recorded in an assignment's history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Reassigned,
    Rescheduled,
    ConflictResolved,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Reassigned => "reassigned",
            Self::Rescheduled => "rescheduled",
            Self::ConflictResolved => "conflict_resolved",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "reassigned" => Self::Reassigned,
            "rescheduled" => Self::Rescheduled,
            "conflict_resolved" => Self::ConflictResolved,
            _ => Self::Created,
        }
    }
}

/// Append-only audit entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentHistoryEntry {
    pub id: Uuid,
    pub action: HistoryAction,
    pub performed_by: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub previous_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Resolution that produced this entry, if any
    #[serde(default)]
    pub resolution_id: Option<Uuid>,
}

/// Assignment entity with the installation snapshot it was fetched with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub id: Uuid,
    pub installation: Installation,
    pub lead_id: Uuid,
    #[serde(default)]
    pub assistant_id: Option<Uuid>,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub estimated_travel_minutes: Option<i32>,
    #[serde(default)]
    pub estimated_travel_km: Option<f64>,
    #[serde(default)]
    pub actual_travel_minutes: Option<i32>,
    #[serde(default)]
    pub buffer_minutes: Option<i32>,
    #[serde(default)]
    pub workload_score: Option<f64>,
    #[serde(default)]
    pub efficiency_score: Option<f64>,
    #[serde(default)]
    pub history: Vec<AssignmentHistoryEntry>,
}

impl Assignment {
    /// Members working this assignment, lead first
    pub fn members(&self) -> impl Iterator<Item = (Uuid, AssignmentRole)> {
        std::iter::once((self.lead_id, AssignmentRole::Lead)).chain(
            self.assistant_id
                .filter(|assistant| *assistant != self.lead_id)
                .map(|assistant| (assistant, AssignmentRole::Assistant)),
        )
    }

    pub fn role_of(&self, member_id: Uuid) -> Option<AssignmentRole> {
        self.members()
            .find(|(id, _)| *id == member_id)
            .map(|(_, role)| role)
    }
}

/// Partial update applied to an assignment
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssignmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AssignmentStatus>,
}
