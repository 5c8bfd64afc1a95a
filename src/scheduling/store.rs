//! Data-store seam consumed by the scheduling engine.
//!
//! The engine never infers tenancy: every call carries the organization/project
//! scope supplied by the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DataAccessError;
use super::interval::DateRange;
use crate::domain::{
    Assignment, AssignmentHistoryEntry, AssignmentPatch, InstallationPatch, ProposedChange,
    TeamMember,
};

/// Organization/project boundary for a store call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    pub organization_id: Uuid,
    pub project_id: Uuid,
}

impl TenantScope {
    pub fn new(organization_id: Uuid, project_id: Uuid) -> Self {
        Self {
            organization_id,
            project_id,
        }
    }
}

/// History trace of one change already written for a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    pub assignment_id: Uuid,
    pub new_value: Option<String>,
}

impl AppliedChange {
    pub fn records(&self, change: &ProposedChange) -> bool {
        self.assignment_id == change.assignment_id
            && self.new_value.as_deref() == Some(change.proposed_value().as_str())
    }
}

#[async_trait]
pub trait SchedulingStore: Send + Sync {
    /// Assignments whose installation is scheduled inside `range`
    async fn fetch_assignments(
        &self,
        scope: &TenantScope,
        range: &DateRange,
    ) -> Result<Vec<Assignment>, DataAccessError>;

    /// Assignments of the given installations, scheduled or not
    async fn fetch_assignments_by_installation(
        &self,
        scope: &TenantScope,
        installation_ids: &[Uuid],
    ) -> Result<Vec<Assignment>, DataAccessError>;

    async fn fetch_team_members(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<TeamMember>, DataAccessError>;

    async fn update_installation(
        &self,
        scope: &TenantScope,
        installation_id: Uuid,
        patch: &InstallationPatch,
    ) -> Result<(), DataAccessError>;

    async fn update_assignment(
        &self,
        scope: &TenantScope,
        assignment_id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<(), DataAccessError>;

    /// Fails with `NotFound` for assignments outside `scope`
    async fn append_history(
        &self,
        scope: &TenantScope,
        assignment_id: Uuid,
        entry: &AssignmentHistoryEntry,
    ) -> Result<(), DataAccessError>;

    /// Changes already recorded in history under `resolution_id`
    async fn applied_changes(
        &self,
        scope: &TenantScope,
        resolution_id: Uuid,
    ) -> Result<Vec<AppliedChange>, DataAccessError>;

    /// Lightweight connectivity check
    async fn ping(&self) -> Result<(), DataAccessError>;
}
