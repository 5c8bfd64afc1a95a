//! Installation domain types
//!
//! An installation is a single schedulable unit of field work at a customer address.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Installation status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InstallationStatus {
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
}

impl Default for InstallationStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl InstallationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
        }
    }

    /// Parse a stored status, falling back to pending for unknown values
    pub fn from_db(value: &str) -> Self {
        match value {
            "scheduled" => Self::Scheduled,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "rescheduled" => Self::Rescheduled,
            _ => Self::Pending,
        }
    }

    /// Whether the installation still occupies a slot on somebody's schedule
    pub fn is_schedulable(&self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installation priority enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InstallationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for InstallationPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl InstallationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "low" => Self::Low,
            "high" => Self::High,
            "urgent" => Self::Urgent,
            _ => Self::Medium,
        }
    }
}

/// Installation entity
///
/// Schedule fields are optional because rows imported in bulk may be incomplete;
/// conflict detection skips any installation it cannot place on the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Installation {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Uuid,
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub address: String,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub scheduled_time: Option<NaiveTime>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub status: InstallationStatus,
    #[serde(default)]
    pub priority: InstallationPriority,
    #[serde(default)]
    pub lead_id: Option<Uuid>,
    #[serde(default)]
    pub assistant_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied to an installation by the resolution applier
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InstallationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InstallationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<Uuid>,
}

impl InstallationPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl Installation {
    /// Apply a patch in place, bumping `updated_at`
    pub fn apply_patch(&mut self, patch: &InstallationPatch) {
        if let Some(date) = patch.scheduled_date {
            self.scheduled_date = Some(date);
        }
        if let Some(time) = patch.scheduled_time {
            self.scheduled_time = Some(time);
        }
        if let Some(duration) = patch.duration_minutes {
            self.duration_minutes = Some(duration);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(lead) = patch.lead_id {
            self.lead_id = Some(lead);
        }
        if let Some(assistant) = patch.assistant_id {
            self.assistant_id = Some(assistant);
        }
        self.updated_at = Utc::now();
    }
}
