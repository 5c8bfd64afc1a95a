//! Builders shared by the scheduling test suites.

use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Assignment, AssignmentStatus, Installation, InstallationPriority, InstallationStatus,
    TeamMember, WorkPreferences,
};

pub fn org() -> Uuid {
    Uuid::from_u128(0x0A)
}

pub fn project() -> Uuid {
    Uuid::from_u128(0x0B)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn member(id: u128) -> TeamMember {
    TeamMember {
        id: Uuid::from_u128(id),
        organization_id: org(),
        name: format!("Installer {}", id),
        email: None,
        region: Some("north".to_string()),
        capacity_minutes: None,
        travel_radius_km: Some(40.0),
        specializations: vec!["solar".to_string()],
        availability: Vec::new(),
        time_off: Vec::new(),
        preferences: WorkPreferences::default(),
        is_active: true,
    }
}

pub fn installation(id: u128, date: NaiveDate, start: NaiveTime, minutes: i32) -> Installation {
    let now = Utc::now();
    Installation {
        id: Uuid::from_u128(id),
        organization_id: org(),
        project_id: project(),
        customer_name: format!("Customer {}", id),
        customer_email: None,
        customer_phone: None,
        address: format!("{} Main Street", id),
        scheduled_date: Some(date),
        scheduled_time: Some(start),
        duration_minutes: Some(minutes),
        status: InstallationStatus::Scheduled,
        priority: InstallationPriority::Medium,
        lead_id: None,
        assistant_id: None,
        notes: None,
        created_at: now,
        updated_at: now,
    }
}

/// Assignment of installation `id` led by `lead`; the assignment id is `id + 1000`
pub fn assignment(
    id: u128,
    lead: u128,
    date: NaiveDate,
    start: NaiveTime,
    minutes: i32,
) -> Assignment {
    let mut installation = installation(id, date, start, minutes);
    installation.lead_id = Some(Uuid::from_u128(lead));
    Assignment {
        id: Uuid::from_u128(id + 1000),
        installation,
        lead_id: Uuid::from_u128(lead),
        assistant_id: None,
        status: AssignmentStatus::Assigned,
        estimated_travel_minutes: None,
        estimated_travel_km: None,
        actual_travel_minutes: None,
        buffer_minutes: None,
        workload_score: None,
        efficiency_score: None,
        history: Vec::new(),
    }
}
