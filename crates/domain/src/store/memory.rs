//! In-memory [`AuditStore`] for development and tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

use super::{
    AuditPlanFanOut, AuditStore, AuditSubmission, CreatedAuditPlan, ResolutionWrite, StoreError,
    StoreResult, SubmissionOutcome,
};
use crate::models::{
    ActionStatus, Asset, AssetPatch, AssignmentStatus, AuditAsset, AuditAssignment,
    AuditLogEntry, AuditPlan, AuditPlanStatus, CorrectiveAction, CorrectiveActionAssignment,
    Employee, Location, NewAuditLogEntry, NewCorrectiveAction, NewCorrectiveActionAssignment,
    NotesLog,
};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    employees: BTreeMap<i64, Employee>,
    locations: BTreeMap<i64, Location>,
    assets: BTreeMap<i64, Asset>,
    plans: BTreeMap<i64, AuditPlan>,
    assignments: BTreeMap<i64, AuditAssignment>,
    audit_assets: BTreeMap<i64, AuditAsset>,
    actions: BTreeMap<i64, CorrectiveAction>,
    action_assignments: BTreeMap<i64, CorrectiveActionAssignment>,
    audit_log: Vec<AuditLogEntry>,
    failing_action_writes: BTreeSet<i64>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Store backed by ordered maps behind one async mutex.
///
/// Each trait call holds the lock for its whole body, which gives every
/// unit of work the same all-or-nothing behavior as a database transaction.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    state: Mutex<MemoryState>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_employee(&self, employee: Employee) {
        self.state.lock().await.employees.insert(employee.id, employee);
    }

    pub async fn insert_location(&self, location: Location) {
        self.state.lock().await.locations.insert(location.id, location);
    }

    pub async fn insert_asset(&self, asset: Asset) {
        self.state.lock().await.assets.insert(asset.id, asset);
    }

    /// Current copy of a canonical asset.
    pub async fn asset(&self, id: i64) -> Option<Asset> {
        self.state.lock().await.assets.get(&id).cloned()
    }

    /// Every audit log entry written so far.
    pub async fn audit_log(&self) -> Vec<AuditLogEntry> {
        self.state.lock().await.audit_log.clone()
    }

    /// Make writes of corrective action `id` fail from now on.
    pub async fn fail_action_writes_for(&self, id: i64) {
        self.state.lock().await.failing_action_writes.insert(id);
    }

    /// Overwrites an audit asset. Lets tests arrange states directly.
    pub async fn put_audit_asset(&self, audit_asset: AuditAsset) {
        self.state
            .lock()
            .await
            .audit_assets
            .insert(audit_asset.id, audit_asset);
    }
}

fn sorted_by_due(mut actions: Vec<CorrectiveAction>) -> Vec<CorrectiveAction> {
    actions.sort_by_key(|a| (a.due_date, a.id));
    actions
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_employee(&self, id: i64) -> StoreResult<Option<Employee>> {
        Ok(self.state.lock().await.employees.get(&id).cloned())
    }

    async fn find_employees(&self, ids: &[i64]) -> StoreResult<Vec<Employee>> {
        let state = self.state.lock().await;
        Ok(state
            .employees
            .values()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect())
    }

    async fn find_employee_by_name(&self, name: &str) -> StoreResult<Option<Employee>> {
        let state = self.state.lock().await;
        Ok(state.employees.values().find(|e| e.name == name).cloned())
    }

    async fn find_locations(&self, ids: &[i64]) -> StoreResult<Vec<Location>> {
        let state = self.state.lock().await;
        Ok(state
            .locations
            .values()
            .filter(|l| ids.contains(&l.id))
            .cloned()
            .collect())
    }

    async fn find_asset(&self, id: i64) -> StoreResult<Option<Asset>> {
        Ok(self.state.lock().await.assets.get(&id).cloned())
    }

    async fn find_assets(&self, ids: &[i64]) -> StoreResult<Vec<Asset>> {
        let state = self.state.lock().await;
        Ok(state
            .assets
            .values()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn assets_in_locations(&self, names: &[String]) -> StoreResult<Vec<Asset>> {
        let state = self.state.lock().await;
        Ok(state
            .assets
            .values()
            .filter(|a| names.iter().any(|n| *n == a.location))
            .cloned()
            .collect())
    }

    async fn create_audit_plan(&self, fan_out: AuditPlanFanOut) -> StoreResult<CreatedAuditPlan> {
        let mut state = self.state.lock().await;
        let created_at = fan_out.plan.created_at;

        let plan_id = state.next_id();
        let plan = AuditPlan {
            id: plan_id,
            name: fan_out.plan.name,
            description: fan_out.plan.description,
            start_date: fan_out.plan.start_date,
            due_date: fan_out.plan.due_date,
            status: AuditPlanStatus::Planning,
            created_by: fan_out.plan.created_by,
            created_at,
        };
        state.plans.insert(plan_id, plan.clone());

        let mut assignments = Vec::with_capacity(fan_out.assignments.len());
        for pair in fan_out.assignments {
            let assignment = AuditAssignment {
                id: state.next_id(),
                audit_plan_id: plan_id,
                location_id: pair.location_id,
                auditor_id: pair.auditor_id,
                status: AssignmentStatus::Assigned,
                notes: None,
                created_at,
            };
            state.assignments.insert(assignment.id, assignment.clone());
            assignments.push(assignment);
        }

        let mut audit_assets = Vec::with_capacity(fan_out.snapshots.len());
        for snapshot in fan_out.snapshots {
            let audit_asset = AuditAsset {
                id: state.next_id(),
                audit_plan_id: plan_id,
                asset_id: snapshot.asset_id,
                original_location: snapshot.location.clone(),
                original_user: snapshot.user.clone(),
                original_status: snapshot.status,
                current_status: snapshot.status,
                current_location: snapshot.location,
                current_user: snapshot.user,
                auditor_notes: None,
                audited_at: None,
                audited_by: None,
                audit_status: false,
                resolved: false,
                created_at,
                updated_at: created_at,
            };
            state.audit_assets.insert(audit_asset.id, audit_asset.clone());
            audit_assets.push(audit_asset);
        }

        let mut log = fan_out.log;
        log.resource_id = Some(plan_id.to_string());
        let log_id = state.next_id();
        state.audit_log.push(log.into_entry(log_id));

        Ok(CreatedAuditPlan {
            plan,
            assignments,
            audit_assets,
        })
    }

    async fn find_audit_plan(&self, id: i64) -> StoreResult<Option<AuditPlan>> {
        Ok(self.state.lock().await.plans.get(&id).cloned())
    }

    async fn active_audit_plans(&self) -> StoreResult<Vec<AuditPlan>> {
        let state = self.state.lock().await;
        Ok(state.plans.values().filter(|p| p.is_active()).cloned().collect())
    }

    async fn update_audit_plan_status(
        &self,
        id: i64,
        from: Option<AuditPlanStatus>,
        to: AuditPlanStatus,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let Some(plan) = state.plans.get_mut(&id) else {
            return Ok(false);
        };
        if plan.status == to || from.is_some_and(|from| from != plan.status) {
            return Ok(false);
        }
        plan.status = to;
        Ok(true)
    }

    async fn assignments_for_plan(&self, audit_plan_id: i64) -> StoreResult<Vec<AuditAssignment>> {
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .values()
            .filter(|a| a.audit_plan_id == audit_plan_id)
            .cloned()
            .collect())
    }

    async fn find_audit_asset(&self, id: i64) -> StoreResult<Option<AuditAsset>> {
        Ok(self.state.lock().await.audit_assets.get(&id).cloned())
    }

    async fn audit_assets_for_plan(&self, audit_plan_id: i64) -> StoreResult<Vec<AuditAsset>> {
        let state = self.state.lock().await;
        Ok(state
            .audit_assets
            .values()
            .filter(|a| a.audit_plan_id == audit_plan_id)
            .cloned()
            .collect())
    }

    async fn record_audit_submission(
        &self,
        submission: &AuditSubmission,
    ) -> StoreResult<SubmissionOutcome> {
        let mut state = self.state.lock().await;
        let audit_asset = &submission.audit_asset;

        match state.audit_assets.get(&audit_asset.id) {
            Some(stored) if stored.resolved => return Ok(SubmissionOutcome::AlreadyResolved),
            Some(_) => {}
            None => return Err(StoreError::RowNotFound(format!("audit_asset {}", audit_asset.id))),
        }

        let Some(asset) = state.assets.get_mut(&audit_asset.asset_id) else {
            return Err(StoreError::RowNotFound(format!("asset {}", audit_asset.asset_id)));
        };
        if submission.asset_patch.require_unassigned && asset.user_id.is_some() {
            return Ok(SubmissionOutcome::AlreadyAssigned);
        }
        submission.asset_patch.apply_to(asset);

        state.audit_assets.insert(audit_asset.id, audit_asset.clone());
        Ok(SubmissionOutcome::Recorded)
    }

    async fn write_resolution(
        &self,
        audit_asset_id: i64,
        asset_id: i64,
        patch: &AssetPatch,
    ) -> StoreResult<ResolutionWrite> {
        let mut state = self.state.lock().await;
        let Some(resolved) = state.audit_assets.get(&audit_asset_id).map(|a| a.resolved) else {
            return Err(StoreError::RowNotFound(format!("audit_asset {}", audit_asset_id)));
        };
        let Some(asset) = state.assets.get_mut(&asset_id) else {
            return Err(StoreError::RowNotFound(format!("asset {}", asset_id)));
        };
        if resolved && !patch.changes(asset) {
            return Ok(ResolutionWrite::Unchanged(asset.clone()));
        }
        let previous_status = asset.status;
        patch.apply_to(asset);
        let asset = asset.clone();

        if let Some(audit_asset) = state.audit_assets.get_mut(&audit_asset_id) {
            audit_asset.resolved = true;
            audit_asset.updated_at = patch.at;
        }
        Ok(ResolutionWrite::Applied { previous_status, asset })
    }

    async fn insert_corrective_action(
        &self,
        action: NewCorrectiveAction,
        assignment: Option<NewCorrectiveActionAssignment>,
    ) -> StoreResult<(CorrectiveAction, Option<CorrectiveActionAssignment>)> {
        let mut state = self.state.lock().await;
        let action = CorrectiveAction {
            id: state.next_id(),
            audit_asset_id: action.audit_asset_id,
            audit_plan_id: action.audit_plan_id,
            issue: action.issue,
            action: action.action,
            assigned_to: action.assigned_to,
            priority: action.priority,
            status: ActionStatus::Pending,
            due_date: action.due_date,
            completed_date: None,
            notes: action.notes,
            created_at: action.created_at,
            updated_at: action.created_at,
        };
        state.actions.insert(action.id, action.clone());

        let assignment = match assignment {
            Some(new) => {
                let assignment = CorrectiveActionAssignment {
                    id: state.next_id(),
                    corrective_action_id: action.id,
                    audit_assignment_id: new.audit_assignment_id,
                    auditor_id: new.auditor_id,
                    status: ActionStatus::Pending,
                    started_at: None,
                    completed_at: None,
                    progress_notes: NotesLog::new(),
                    created_at: new.created_at,
                    updated_at: new.created_at,
                };
                state
                    .action_assignments
                    .insert(assignment.id, assignment.clone());
                Some(assignment)
            }
            None => None,
        };

        Ok((action, assignment))
    }

    async fn find_corrective_action(&self, id: i64) -> StoreResult<Option<CorrectiveAction>> {
        Ok(self.state.lock().await.actions.get(&id).cloned())
    }

    async fn find_corrective_actions(&self, ids: &[i64]) -> StoreResult<Vec<CorrectiveAction>> {
        let state = self.state.lock().await;
        Ok(state
            .actions
            .values()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn corrective_actions_for_plan(
        &self,
        audit_plan_id: i64,
    ) -> StoreResult<Vec<CorrectiveAction>> {
        let state = self.state.lock().await;
        Ok(state
            .actions
            .values()
            .filter(|a| a.audit_plan_id == audit_plan_id)
            .cloned()
            .collect())
    }

    async fn overdue_corrective_actions(
        &self,
        today: NaiveDate,
    ) -> StoreResult<Vec<CorrectiveAction>> {
        let state = self.state.lock().await;
        Ok(sorted_by_due(
            state
                .actions
                .values()
                .filter(|a| a.is_overdue(today))
                .cloned()
                .collect(),
        ))
    }

    async fn upcoming_corrective_actions(
        &self,
        today: NaiveDate,
    ) -> StoreResult<Vec<CorrectiveAction>> {
        let state = self.state.lock().await;
        Ok(sorted_by_due(
            state
                .actions
                .values()
                .filter(|a| a.is_active() && a.due_date >= today)
                .cloned()
                .collect(),
        ))
    }

    async fn count_incomplete_corrective_actions(&self, audit_asset_id: i64) -> StoreResult<i64> {
        let state = self.state.lock().await;
        let count = state
            .actions
            .values()
            .filter(|a| a.audit_asset_id == audit_asset_id && !a.is_completed())
            .count();
        Ok(count as i64)
    }

    async fn find_action_assignment(
        &self,
        corrective_action_id: i64,
    ) -> StoreResult<Option<CorrectiveActionAssignment>> {
        let state = self.state.lock().await;
        Ok(state
            .action_assignments
            .values()
            .find(|a| a.corrective_action_id == corrective_action_id)
            .cloned())
    }

    async fn update_corrective_action(
        &self,
        action: &CorrectiveAction,
        assignment: Option<&CorrectiveActionAssignment>,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.actions.contains_key(&action.id) {
            return Err(StoreError::RowNotFound(format!("corrective_action {}", action.id)));
        }
        if state.failing_action_writes.contains(&action.id) {
            return Err(StoreError::Database(format!(
                "write rejected for corrective_action {}",
                action.id
            )));
        }
        if let Some(assignment) = assignment {
            if !state.action_assignments.contains_key(&assignment.id) {
                return Err(StoreError::RowNotFound(format!(
                    "corrective_action_assignment {}",
                    assignment.id
                )));
            }
            state
                .action_assignments
                .insert(assignment.id, assignment.clone());
        }
        state.actions.insert(action.id, action.clone());
        Ok(())
    }

    async fn append_audit_log(&self, entry: NewAuditLogEntry) -> StoreResult<AuditLogEntry> {
        let mut state = self.state.lock().await;
        let entry = entry.into_entry(state.next_id());
        state.audit_log.push(entry.clone());
        Ok(entry)
    }
}
