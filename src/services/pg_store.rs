//! PostgreSQL scheduling store
//!
//! Reads and writes `installations`, `assignments`, `assignment_history` and
//! `team_members`. Every statement is filtered by organization, and by project
//! where the table carries one.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{types::Json, PgPool};
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{
    Assignment, AssignmentHistoryEntry, AssignmentPatch, AssignmentStatus, AvailabilityWindow,
    HistoryAction, Installation, InstallationPatch, InstallationPriority, InstallationStatus,
    TeamMember, WorkPreferences,
};
use crate::scheduling::{AppliedChange, DataAccessError, DateRange, SchedulingStore, TenantScope};

/// Assignment joined with its installation
#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    id: Uuid,
    lead_id: Uuid,
    assistant_id: Option<Uuid>,
    status: String,
    estimated_travel_minutes: Option<i32>,
    estimated_travel_km: Option<f64>,
    actual_travel_minutes: Option<i32>,
    buffer_minutes: Option<i32>,
    workload_score: Option<f64>,
    efficiency_score: Option<f64>,
    installation_id: Uuid,
    organization_id: Uuid,
    project_id: Uuid,
    customer_name: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    address: String,
    scheduled_date: Option<NaiveDate>,
    scheduled_time: Option<NaiveTime>,
    duration_minutes: Option<i32>,
    installation_status: String,
    priority: String,
    installation_lead_id: Option<Uuid>,
    installation_assistant_id: Option<Uuid>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AssignmentRow> for Assignment {
    fn from(row: AssignmentRow) -> Self {
        Self {
            id: row.id,
            installation: Installation {
                id: row.installation_id,
                organization_id: row.organization_id,
                project_id: row.project_id,
                customer_name: row.customer_name,
                customer_email: row.customer_email,
                customer_phone: row.customer_phone,
                address: row.address,
                scheduled_date: row.scheduled_date,
                scheduled_time: row.scheduled_time,
                duration_minutes: row.duration_minutes,
                status: InstallationStatus::from_db(&row.installation_status),
                priority: InstallationPriority::from_db(&row.priority),
                lead_id: row.installation_lead_id,
                assistant_id: row.installation_assistant_id,
                notes: row.notes,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            lead_id: row.lead_id,
            assistant_id: row.assistant_id,
            status: AssignmentStatus::from_db(&row.status),
            estimated_travel_minutes: row.estimated_travel_minutes,
            estimated_travel_km: row.estimated_travel_km,
            actual_travel_minutes: row.actual_travel_minutes,
            buffer_minutes: row.buffer_minutes,
            workload_score: row.workload_score,
            efficiency_score: row.efficiency_score,
            history: Vec::new(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    assignment_id: Uuid,
    action: String,
    performed_by: String,
    created_at: DateTime<Utc>,
    previous_value: Option<String>,
    new_value: Option<String>,
    reason: Option<String>,
    resolution_id: Option<Uuid>,
}

impl From<HistoryRow> for AssignmentHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            action: HistoryAction::from_db(&row.action),
            performed_by: row.performed_by,
            timestamp: row.created_at,
            previous_value: row.previous_value,
            new_value: row.new_value,
            reason: row.reason,
            resolution_id: row.resolution_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TeamMemberRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    email: Option<String>,
    region: Option<String>,
    capacity_minutes: Option<i32>,
    travel_radius_km: Option<f64>,
    specializations: Option<Vec<String>>,
    availability: Option<Json<Vec<AvailabilityWindow>>>,
    time_off: Option<Vec<NaiveDate>>,
    max_daily_jobs: Option<i32>,
    max_weekly_hours: Option<i32>,
    is_active: bool,
}

impl From<TeamMemberRow> for TeamMember {
    fn from(row: TeamMemberRow) -> Self {
        Self {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            email: row.email,
            region: row.region,
            capacity_minutes: row.capacity_minutes,
            travel_radius_km: row.travel_radius_km,
            specializations: row.specializations.unwrap_or_default(),
            availability: row.availability.map(|json| json.0).unwrap_or_default(),
            time_off: row.time_off.unwrap_or_default(),
            preferences: WorkPreferences {
                max_daily_jobs: row.max_daily_jobs.and_then(|v| u32::try_from(v).ok()),
                max_weekly_hours: row.max_weekly_hours.and_then(|v| u32::try_from(v).ok()),
            },
            is_active: row.is_active,
        }
    }
}

const ASSIGNMENT_COLUMNS: &str = r#"
    SELECT a.id, a.lead_id, a.assistant_id, a.status,
           a.estimated_travel_minutes, a.estimated_travel_km, a.actual_travel_minutes,
           a.buffer_minutes, a.workload_score, a.efficiency_score,
           i.id AS installation_id, i.organization_id, i.project_id,
           i.customer_name, i.customer_email, i.customer_phone, i.address,
           i.scheduled_date, i.scheduled_time, i.duration_minutes,
           i.status AS installation_status, i.priority,
           i.lead_id AS installation_lead_id, i.assistant_id AS installation_assistant_id,
           i.notes, i.created_at, i.updated_at
    FROM assignments a
    JOIN installations i ON i.id = a.installation_id
"#;

#[derive(Debug, sqlx::FromRow)]
struct AppliedRow {
    assignment_id: Uuid,
    new_value: Option<String>,
}

#[derive(Clone)]
pub struct PgSchedulingStore {
    pool: PgPool,
}

impl PgSchedulingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach history rows to `assignments`
    async fn with_history(
        &self,
        rows: Vec<AssignmentRow>,
    ) -> Result<Vec<Assignment>, DataAccessError> {
        let mut assignments: Vec<Assignment> = rows.into_iter().map(Into::into).collect();
        if assignments.is_empty() {
            return Ok(assignments);
        }

        let ids: Vec<Uuid> = assignments.iter().map(|a| a.id).collect();
        let history = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, assignment_id, action, performed_by, created_at,
                   previous_value, new_value, reason, resolution_id
            FROM assignment_history
            WHERE assignment_id = ANY($1)
            ORDER BY created_at
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_assignment: HashMap<Uuid, Vec<AssignmentHistoryEntry>> = HashMap::new();
        for row in history {
            by_assignment
                .entry(row.assignment_id)
                .or_default()
                .push(row.into());
        }
        for assignment in &mut assignments {
            if let Some(entries) = by_assignment.remove(&assignment.id) {
                assignment.history = entries;
            }
        }
        Ok(assignments)
    }
}

#[async_trait]
impl SchedulingStore for PgSchedulingStore {
    #[instrument(skip(self), fields(organization_id = %scope.organization_id, project_id = %scope.project_id))]
    async fn fetch_assignments(
        &self,
        scope: &TenantScope,
        range: &DateRange,
    ) -> Result<Vec<Assignment>, DataAccessError> {
        let query = format!(
            "{} WHERE i.organization_id = $1 AND i.project_id = $2 \
             AND i.scheduled_date BETWEEN $3 AND $4 \
             ORDER BY i.scheduled_date, i.scheduled_time, a.created_at",
            ASSIGNMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(scope.organization_id)
            .bind(scope.project_id)
            .bind(range.start_date)
            .bind(range.end_date)
            .fetch_all(&self.pool)
            .await?;

        let assignments = self.with_history(rows).await?;
        debug!(count = assignments.len(), "Fetched assignments");
        Ok(assignments)
    }

    #[instrument(skip(self, installation_ids), fields(organization_id = %scope.organization_id, project_id = %scope.project_id))]
    async fn fetch_assignments_by_installation(
        &self,
        scope: &TenantScope,
        installation_ids: &[Uuid],
    ) -> Result<Vec<Assignment>, DataAccessError> {
        if installation_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "{} WHERE i.organization_id = $1 AND i.project_id = $2 AND i.id = ANY($3) \
             ORDER BY a.created_at",
            ASSIGNMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AssignmentRow>(&query)
            .bind(scope.organization_id)
            .bind(scope.project_id)
            .bind(installation_ids)
            .fetch_all(&self.pool)
            .await?;

        self.with_history(rows).await
    }

    #[instrument(skip(self), fields(organization_id = %scope.organization_id))]
    async fn fetch_team_members(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<TeamMember>, DataAccessError> {
        // Rosters are organization-wide; any member may be put on any project
        let rows = sqlx::query_as::<_, TeamMemberRow>(
            r#"
            SELECT id, organization_id, name, email, region, capacity_minutes,
                   travel_radius_km, specializations, availability, time_off,
                   max_daily_jobs, max_weekly_hours, is_active
            FROM team_members
            WHERE organization_id = $1
            ORDER BY name
            "#,
        )
        .bind(scope.organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, patch), fields(organization_id = %scope.organization_id))]
    async fn update_installation(
        &self,
        scope: &TenantScope,
        installation_id: Uuid,
        patch: &InstallationPatch,
    ) -> Result<(), DataAccessError> {
        let result = sqlx::query(
            r#"
            UPDATE installations SET
                scheduled_date = COALESCE($4, scheduled_date),
                scheduled_time = COALESCE($5, scheduled_time),
                duration_minutes = COALESCE($6, duration_minutes),
                status = COALESCE($7, status),
                lead_id = COALESCE($8, lead_id),
                assistant_id = COALESCE($9, assistant_id),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2 AND project_id = $3
            "#,
        )
        .bind(installation_id)
        .bind(scope.organization_id)
        .bind(scope.project_id)
        .bind(patch.scheduled_date)
        .bind(patch.scheduled_time)
        .bind(patch.duration_minutes)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.lead_id)
        .bind(patch.assistant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataAccessError::NotFound(format!("installation {}", installation_id)));
        }
        Ok(())
    }

    #[instrument(skip(self, patch), fields(organization_id = %scope.organization_id))]
    async fn update_assignment(
        &self,
        scope: &TenantScope,
        assignment_id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<(), DataAccessError> {
        let result = sqlx::query(
            r#"
            UPDATE assignments a SET
                lead_id = COALESCE($4, a.lead_id),
                assistant_id = COALESCE($5, a.assistant_id),
                status = COALESCE($6, a.status),
                updated_at = NOW()
            FROM installations i
            WHERE a.id = $1
              AND i.id = a.installation_id
              AND i.organization_id = $2
              AND i.project_id = $3
            "#,
        )
        .bind(assignment_id)
        .bind(scope.organization_id)
        .bind(scope.project_id)
        .bind(patch.lead_id)
        .bind(patch.assistant_id)
        .bind(patch.status.map(|s| s.as_str()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataAccessError::NotFound(format!("assignment {}", assignment_id)));
        }
        Ok(())
    }

    #[instrument(skip(self, entry), fields(action = entry.action.as_str()))]
    async fn append_history(
        &self,
        scope: &TenantScope,
        assignment_id: Uuid,
        entry: &AssignmentHistoryEntry,
    ) -> Result<(), DataAccessError> {
        let result = sqlx::query(
            r#"
            INSERT INTO assignment_history
                (id, assignment_id, organization_id, action, performed_by, created_at,
                 previous_value, new_value, reason, resolution_id)
            SELECT $1, a.id, i.organization_id, $4, $5, $6, $7, $8, $9, $10
            FROM assignments a
            JOIN installations i ON i.id = a.installation_id
            WHERE a.id = $2
              AND i.organization_id = $3
              AND i.project_id = $11
            "#,
        )
        .bind(entry.id)
        .bind(assignment_id)
        .bind(scope.organization_id)
        .bind(entry.action.as_str())
        .bind(&entry.performed_by)
        .bind(entry.timestamp)
        .bind(&entry.previous_value)
        .bind(&entry.new_value)
        .bind(&entry.reason)
        .bind(entry.resolution_id)
        .bind(scope.project_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataAccessError::NotFound(format!("assignment {}", assignment_id)));
        }
        Ok(())
    }

    async fn applied_changes(
        &self,
        scope: &TenantScope,
        resolution_id: Uuid,
    ) -> Result<Vec<AppliedChange>, DataAccessError> {
        let rows = sqlx::query_as::<_, AppliedRow>(
            r#"
            SELECT h.assignment_id, h.new_value
            FROM assignment_history h
            JOIN assignments a ON a.id = h.assignment_id
            JOIN installations i ON i.id = a.installation_id
            WHERE h.resolution_id = $1
              AND i.organization_id = $2
              AND i.project_id = $3
            "#,
        )
        .bind(resolution_id)
        .bind(scope.organization_id)
        .bind(scope.project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AppliedChange {
                assignment_id: row.assignment_id,
                new_value: row.new_value,
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), DataAccessError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
