//! Team member domain types
//!
//! Field workers who lead or assist on installations.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recurring weekly window in which a member accepts work
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityWindow {
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl AvailabilityWindow {
    /// True when `[start, end)` on `date` fits inside this window
    pub fn covers(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        date.weekday() == self.weekday && self.start_time <= start && end <= self.end_time
    }
}

/// Work preferences declared by the member
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkPreferences {
    #[serde(default)]
    pub max_daily_jobs: Option<u32>,
    #[serde(default)]
    pub max_weekly_hours: Option<u32>,
}

/// Team member entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMember {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Explicit daily capacity in minutes, when known
    #[serde(default)]
    pub capacity_minutes: Option<i32>,
    #[serde(default)]
    pub travel_radius_km: Option<f64>,
    #[serde(default)]
    pub specializations: Vec<String>,
    /// Empty means no weekly restriction
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
    #[serde(default)]
    pub time_off: Vec<NaiveDate>,
    #[serde(default)]
    pub preferences: WorkPreferences,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Reason a member cannot take a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailability {
    Inactive,
    TimeOff,
    OutsideAvailability,
}

impl Unavailability {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Inactive => "is not active",
            Self::TimeOff => "is on time off",
            Self::OutsideAvailability => "is outside their availability windows",
        }
    }
}

impl TeamMember {
    /// Check whether the member can work `[start, end)` on `date`
    pub fn check_availability(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<(), Unavailability> {
        if !self.is_active {
            return Err(Unavailability::Inactive);
        }
        if self.time_off.contains(&date) {
            return Err(Unavailability::TimeOff);
        }
        if !self.availability.is_empty()
            && !self.availability.iter().any(|w| w.covers(date, start, end))
        {
            return Err(Unavailability::OutsideAvailability);
        }
        Ok(())
    }

    pub fn is_available(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        self.check_availability(date, start, end).is_ok()
    }
}
