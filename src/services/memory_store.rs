//! In-process scheduling store.
//!
//! Backs local development when no `DATABASE_URL` is configured, and the test
//! suites. Data is partitioned by tenant scope exactly like the Postgres store.
//! Development data comes from a JSON fixture (`DEV_FIXTURE_PATH`).

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::domain::{
    Assignment, AssignmentHistoryEntry, AssignmentPatch, InstallationPatch, TeamMember,
};
use crate::scheduling::{AppliedChange, DataAccessError, DateRange, SchedulingStore, TenantScope};

/// Remaining-writes value meaning writes never fail
const UNLIMITED_WRITES: usize = usize::MAX;

#[derive(Default)]
struct Tenant {
    assignments: Vec<Assignment>,
    team_members: Vec<TeamMember>,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    tenants: Vec<FixtureTenant>,
}

#[derive(Debug, Deserialize)]
struct FixtureTenant {
    organization_id: Uuid,
    project_id: Uuid,
    #[serde(default)]
    assignments: Vec<Assignment>,
    #[serde(default)]
    team_members: Vec<TeamMember>,
}

pub struct InMemoryStore {
    tenants: RwLock<HashMap<TenantScope, Tenant>>,
    writes_left: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
            writes_left: AtomicUsize::new(UNLIMITED_WRITES),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded from a JSON fixture of `{"tenants": [...]}`
    pub fn from_fixture_json(raw: &str) -> anyhow::Result<Self> {
        let fixture: Fixture = serde_json::from_str(raw).context("invalid store fixture")?;
        let store = Self::new();
        for tenant in fixture.tenants {
            store.seed(
                TenantScope::new(tenant.organization_id, tenant.project_id),
                tenant.assignments,
                tenant.team_members,
            );
        }
        Ok(store)
    }

    pub fn from_fixture_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read store fixture {}", path))?;
        Self::from_fixture_json(&raw)
    }

    /// Replace the data held for `scope`
    pub fn seed(&self, scope: TenantScope, assignments: Vec<Assignment>, team_members: Vec<TeamMember>) {
        tracing::debug!(
            organization_id = %scope.organization_id,
            project_id = %scope.project_id,
            assignments = assignments.len(),
            team_members = team_members.len(),
            "Seeding in-memory store"
        );
        self.tenants.write().insert(
            scope,
            Tenant {
                assignments,
                team_members,
            },
        );
    }

    /// Snapshot of one assignment, searching every tenant
    #[cfg(test)]
    pub fn assignment(&self, assignment_id: Uuid) -> Option<Assignment> {
        self.tenants
            .read()
            .values()
            .flat_map(|tenant| tenant.assignments.iter())
            .find(|a| a.id == assignment_id)
            .cloned()
    }

    /// Make every subsequent write fail with a database error
    #[cfg(test)]
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes_after(if fail { 0 } else { UNLIMITED_WRITES });
    }

    /// Let `writes` more writes succeed, then fail every later one
    #[cfg(test)]
    pub fn fail_writes_after(&self, writes: usize) {
        self.writes_left.store(writes, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), DataAccessError> {
        let allowed = self
            .writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                UNLIMITED_WRITES => Some(left),
                0 => None,
                _ => Some(left - 1),
            })
            .is_ok();
        if !allowed {
            return Err(DataAccessError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn with_tenant<R>(
        &self,
        scope: &TenantScope,
        f: impl FnOnce(&mut Tenant) -> Result<R, DataAccessError>,
    ) -> Result<R, DataAccessError> {
        let mut tenants = self.tenants.write();
        let tenant = tenants.get_mut(scope).ok_or_else(|| {
            DataAccessError::NotFound(format!(
                "project {} in organization {}",
                scope.project_id, scope.organization_id
            ))
        })?;
        f(tenant)
    }
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn fetch_assignments(
        &self,
        scope: &TenantScope,
        range: &DateRange,
    ) -> Result<Vec<Assignment>, DataAccessError> {
        Ok(self
            .tenants
            .read()
            .get(scope)
            .map(|tenant| {
                tenant
                    .assignments
                    .iter()
                    .filter(|a| {
                        a.installation
                            .scheduled_date
                            .is_some_and(|date| range.contains(date))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_assignments_by_installation(
        &self,
        scope: &TenantScope,
        installation_ids: &[Uuid],
    ) -> Result<Vec<Assignment>, DataAccessError> {
        Ok(self
            .tenants
            .read()
            .get(scope)
            .map(|tenant| {
                tenant
                    .assignments
                    .iter()
                    .filter(|a| installation_ids.contains(&a.installation.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_team_members(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<TeamMember>, DataAccessError> {
        Ok(self
            .tenants
            .read()
            .get(scope)
            .map(|tenant| tenant.team_members.clone())
            .unwrap_or_default())
    }

    async fn update_installation(
        &self,
        scope: &TenantScope,
        installation_id: Uuid,
        patch: &InstallationPatch,
    ) -> Result<(), DataAccessError> {
        self.check_writable()?;
        self.with_tenant(scope, |tenant| {
            let mut found = false;
            for assignment in tenant
                .assignments
                .iter_mut()
                .filter(|a| a.installation.id == installation_id)
            {
                assignment.installation.apply_patch(patch);
                found = true;
            }
            if found {
                Ok(())
            } else {
                Err(DataAccessError::NotFound(format!("installation {}", installation_id)))
            }
        })
    }

    async fn update_assignment(
        &self,
        scope: &TenantScope,
        assignment_id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<(), DataAccessError> {
        self.check_writable()?;
        self.with_tenant(scope, |tenant| {
            let assignment = tenant
                .assignments
                .iter_mut()
                .find(|a| a.id == assignment_id)
                .ok_or_else(|| DataAccessError::NotFound(format!("assignment {}", assignment_id)))?;
            if let Some(lead) = patch.lead_id {
                assignment.lead_id = lead;
            }
            if let Some(assistant) = patch.assistant_id {
                assignment.assistant_id = Some(assistant);
            }
            if let Some(status) = patch.status {
                assignment.status = status;
            }
            Ok(())
        })
    }

    async fn append_history(
        &self,
        scope: &TenantScope,
        assignment_id: Uuid,
        entry: &AssignmentHistoryEntry,
    ) -> Result<(), DataAccessError> {
        self.check_writable()?;
        self.with_tenant(scope, |tenant| {
            let assignment = tenant
                .assignments
                .iter_mut()
                .find(|a| a.id == assignment_id)
                .ok_or_else(|| DataAccessError::NotFound(format!("assignment {}", assignment_id)))?;
            assignment.history.push(entry.clone());
            Ok(())
        })
    }

    async fn applied_changes(
        &self,
        scope: &TenantScope,
        resolution_id: Uuid,
    ) -> Result<Vec<AppliedChange>, DataAccessError> {
        Ok(self
            .tenants
            .read()
            .get(scope)
            .map(|tenant| {
                tenant
                    .assignments
                    .iter()
                    .flat_map(|a| {
                        a.history
                            .iter()
                            .filter(|entry| entry.resolution_id == Some(resolution_id))
                            .map(|entry| AppliedChange {
                                assignment_id: a.id,
                                new_value: entry.new_value.clone(),
                            })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), DataAccessError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::test_support::*;

    fn scope() -> TenantScope {
        TenantScope::new(org(), project())
    }

    #[tokio::test]
    async fn test_fetch_is_scoped_and_ranged() {
        let store = InMemoryStore::new();
        store.seed(
            scope(),
            vec![
                assignment(1, 100, day(4), time(9, 0), 60),
                assignment(2, 100, day(9), time(9, 0), 60),
            ],
            vec![member(100)],
        );

        let found = store
            .fetch_assignments(&scope(), &DateRange::new(day(1), day(5)))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let other = TenantScope::new(org(), Uuid::from_u128(0xFF));
        assert!(store
            .fetch_assignments(&other, &DateRange::new(day(1), day(31)))
            .await
            .unwrap()
            .is_empty());
        assert!(store.fetch_team_members(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writes_to_unknown_records_fail() {
        let store = InMemoryStore::new();
        store.seed(scope(), Vec::new(), Vec::new());
        let result = store
            .update_assignment(&scope(), Uuid::new_v4(), &AssignmentPatch::default())
            .await;
        assert!(matches!(result, Err(DataAccessError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_history_cannot_cross_tenants() {
        let store = InMemoryStore::new();
        let job = assignment(1, 100, day(4), time(9, 0), 60);
        store.seed(scope(), vec![job.clone()], Vec::new());
        let other = TenantScope::new(Uuid::from_u128(0xEE), project());
        store.seed(other, Vec::new(), Vec::new());

        let entry = AssignmentHistoryEntry {
            id: Uuid::new_v4(),
            action: crate::domain::HistoryAction::Rescheduled,
            performed_by: "ops".to_string(),
            timestamp: chrono::Utc::now(),
            previous_value: None,
            new_value: None,
            reason: None,
            resolution_id: None,
        };
        let result = store.append_history(&other, job.id, &entry).await;
        assert!(matches!(result, Err(DataAccessError::NotFound(_))));
        assert!(store.assignment(job.id).unwrap().history.is_empty());
    }

    #[tokio::test]
    async fn test_writes_fail_after_budget() {
        let store = InMemoryStore::new();
        let job = assignment(1, 100, day(4), time(9, 0), 60);
        store.seed(scope(), vec![job.clone()], Vec::new());
        store.fail_writes_after(1);

        let patch = AssignmentPatch::default();
        assert!(store.update_assignment(&scope(), job.id, &patch).await.is_ok());
        assert!(matches!(
            store.update_assignment(&scope(), job.id, &patch).await,
            Err(DataAccessError::Database(_))
        ));
        store.fail_writes(false);
        assert!(store.update_assignment(&scope(), job.id, &patch).await.is_ok());
    }

    #[tokio::test]
    async fn test_fixture_seeds_tenants() {
        let job = assignment(1, 100, day(4), time(9, 0), 60);
        let raw = serde_json::json!({
            "tenants": [{
                "organization_id": org(),
                "project_id": project(),
                "assignments": [job],
                "team_members": [member(100)]
            }]
        })
        .to_string();

        let store = InMemoryStore::from_fixture_json(&raw).unwrap();
        let found = store
            .fetch_assignments_by_installation(&scope(), &[Uuid::from_u128(1)])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.fetch_team_members(&scope()).await.unwrap().len(), 1);
        assert!(InMemoryStore::from_fixture_json("{}").is_err());
    }
}
