//! Applies accepted resolutions through the data store.
//!
//! Each resolution is applied independently. A failure part-way through one
//! resolution leaves its earlier writes in place; the report lists what failed so
//! the caller can retry that subset. A change counts as done once its history
//! entry is written, so a retry picks up only the changes still missing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::error::{DataAccessError, SchedulingError, SchedulingResult};
use super::store::{SchedulingStore, TenantScope};
use crate::domain::{
    AssignmentHistoryEntry, AssignmentPatch, AssignmentRole, ChangeDetail, ConflictResolution,
    HistoryAction, InstallationPatch, InstallationStatus, ProposedChange, ResolutionStatus,
};

/// Why a single resolution was not applied
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("resolution is {0}, only pending resolutions can be applied")]
    NotPending(ResolutionStatus),

    #[error("another resolution for conflict {0} was already applied")]
    Superseded(Uuid),

    #[error("resolution was already applied")]
    AlreadyApplied,

    #[error("resolution proposes no changes")]
    NoChanges,

    #[error("no replacement {role} selected for installation {installation_id}")]
    NoReplacement {
        role: AssignmentRole,
        installation_id: Uuid,
    },

    #[error("data access failed: {0}")]
    Store(#[from] DataAccessError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedResolution {
    pub resolution_id: Uuid,
    pub error: String,
}

/// Outcome of one apply batch
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApplyReport {
    pub applied: Vec<Uuid>,
    pub failed: Vec<FailedResolution>,
    /// Resolutions dropped because a sibling for the same conflict won
    #[serde(default)]
    pub discarded: Vec<Uuid>,
}

impl ApplyReport {
    /// Fold a later batch's outcome into this one
    pub fn merge(&mut self, other: ApplyReport) {
        self.applied.extend(other.applied);
        self.failed.extend(other.failed);
        self.discarded.extend(other.discarded);
    }
}

#[derive(Clone)]
pub struct ResolutionApplier {
    store: Arc<dyn SchedulingStore>,
}

impl ResolutionApplier {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Apply `resolutions` in order on behalf of `performed_by`.
    ///
    /// Only an empty batch or a blank actor fails the whole call; everything else
    /// is reported per resolution. Statuses on the passed-in resolutions are
    /// updated to `applied` or `discarded` as they settle.
    #[instrument(skip(self, resolutions), fields(
        organization_id = %scope.organization_id,
        project_id = %scope.project_id,
        batch = resolutions.len()
    ))]
    pub async fn apply(
        &self,
        scope: &TenantScope,
        resolutions: &mut [ConflictResolution],
        performed_by: &str,
    ) -> SchedulingResult<ApplyReport> {
        if resolutions.is_empty() {
            return Err(SchedulingError::validation("no resolutions to apply"));
        }
        let performed_by = performed_by.trim();
        if performed_by.is_empty() {
            return Err(SchedulingError::validation("performed_by must not be blank"));
        }

        let mut report = ApplyReport::default();
        let mut resolved_conflicts: HashSet<Uuid> = HashSet::new();

        for resolution in resolutions.iter_mut() {
            match self
                .apply_one(scope, resolution, &resolved_conflicts, performed_by)
                .await
            {
                Ok(()) => {
                    resolution.status = ResolutionStatus::Applied;
                    resolved_conflicts.insert(resolution.conflict_id);
                    report.applied.push(resolution.id);
                    info!(
                        resolution_id = %resolution.id,
                        conflict_id = %resolution.conflict_id,
                        changes = resolution.proposed_changes.len(),
                        "Resolution applied"
                    );
                }
                Err(e) => {
                    if let ApplyError::Superseded(_) = e {
                        resolution.status = ResolutionStatus::Discarded;
                        report.discarded.push(resolution.id);
                    }
                    warn!(resolution_id = %resolution.id, error = %e, "Resolution not applied");
                    report.failed.push(FailedResolution {
                        resolution_id: resolution.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            applied = report.applied.len(),
            failed = report.failed.len(),
            "Apply batch finished"
        );

        Ok(report)
    }

    async fn apply_one(
        &self,
        scope: &TenantScope,
        resolution: &ConflictResolution,
        resolved_conflicts: &HashSet<Uuid>,
        performed_by: &str,
    ) -> Result<(), ApplyError> {
        if resolution.status != ResolutionStatus::Pending {
            return Err(ApplyError::NotPending(resolution.status));
        }
        if resolved_conflicts.contains(&resolution.conflict_id) {
            return Err(ApplyError::Superseded(resolution.conflict_id));
        }
        if resolution.proposed_changes.is_empty() {
            return Err(ApplyError::NoChanges);
        }
        for change in &resolution.proposed_changes {
            if let ChangeDetail::Reassign {
                role,
                proposed_member_id: None,
                ..
            } = change.detail
            {
                return Err(ApplyError::NoReplacement {
                    role,
                    installation_id: change.installation_id,
                });
            }
        }
        let done = self.store.applied_changes(scope, resolution.id).await?;
        let remaining: Vec<&ProposedChange> = resolution
            .proposed_changes
            .iter()
            .filter(|change| !done.iter().any(|applied| applied.records(change)))
            .collect();
        if remaining.is_empty() {
            return Err(ApplyError::AlreadyApplied);
        }
        if !done.is_empty() {
            info!(
                resolution_id = %resolution.id,
                done = done.len(),
                remaining = remaining.len(),
                "Resuming partially applied resolution"
            );
        }

        for change in remaining {
            self.apply_change(scope, resolution.id, change, performed_by)
                .await?;
        }
        Ok(())
    }

    async fn apply_change(
        &self,
        scope: &TenantScope,
        resolution_id: Uuid,
        change: &ProposedChange,
        performed_by: &str,
    ) -> Result<(), ApplyError> {
        let action = match change.detail {
            ChangeDetail::Reschedule {
                proposed_date,
                proposed_time,
                ..
            } => {
                let patch = InstallationPatch {
                    scheduled_date: Some(proposed_date),
                    scheduled_time: Some(proposed_time),
                    status: Some(InstallationStatus::Rescheduled),
                    ..Default::default()
                };
                self.store
                    .update_installation(scope, change.installation_id, &patch)
                    .await?;
                HistoryAction::Rescheduled
            }
            ChangeDetail::Reassign {
                role,
                proposed_member_id,
                ..
            } => {
                let member = proposed_member_id.ok_or(ApplyError::NoReplacement {
                    role,
                    installation_id: change.installation_id,
                })?;
                let (installation_patch, assignment_patch) = match role {
                    AssignmentRole::Lead => (
                        InstallationPatch {
                            lead_id: Some(member),
                            ..Default::default()
                        },
                        AssignmentPatch {
                            lead_id: Some(member),
                            ..Default::default()
                        },
                    ),
                    AssignmentRole::Assistant => (
                        InstallationPatch {
                            assistant_id: Some(member),
                            ..Default::default()
                        },
                        AssignmentPatch {
                            assistant_id: Some(member),
                            ..Default::default()
                        },
                    ),
                };
                self.store
                    .update_installation(scope, change.installation_id, &installation_patch)
                    .await?;
                self.store
                    .update_assignment(scope, change.assignment_id, &assignment_patch)
                    .await?;
                HistoryAction::Reassigned
            }
            ChangeDetail::Modify {
                proposed_duration_minutes,
                ..
            } => {
                let patch = InstallationPatch {
                    duration_minutes: Some(proposed_duration_minutes),
                    ..Default::default()
                };
                self.store
                    .update_installation(scope, change.installation_id, &patch)
                    .await?;
                HistoryAction::ConflictResolved
            }
        };

        let entry = AssignmentHistoryEntry {
            id: Uuid::new_v4(),
            action,
            performed_by: performed_by.to_string(),
            timestamp: Utc::now(),
            previous_value: Some(change.current_value()),
            new_value: Some(change.proposed_value()),
            reason: Some(change.reason.clone()),
            resolution_id: Some(resolution_id),
        };
        self.store
            .append_history(scope, change.assignment_id, &entry)
            .await?;
        Ok(())
    }
}
