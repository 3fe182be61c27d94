//! Corrective action lifecycle.

use chrono::{Duration, NaiveDate};
use shared::validation::{collect_messages, join_messages, validate_not_blank};
use tracing::{info, warn};
use validator::Validate;

use super::audit::audit_helpers;
use super::context::AuditContext;
use super::corrective_action_notification::CorrectiveActionNotifier;
use super::resolution::{resolution_status_for, Discrepancy, ResolutionEngine, ResolutionOutcome};
use crate::error::{AuditError, AuditResult};
use crate::models::corrective_action::{
    BulkStatusItemResult, BulkStatusUpdateRequest, BulkStatusUpdateResponse,
    CreateCorrectiveActionRequest,
};
use crate::models::{
    ActionPriority, ActionStatus, AssetStatus, AuditAsset, AuditAssignment, AuditPlan,
    CorrectiveAction, NewCorrectiveAction, NewCorrectiveActionAssignment, NotesLog,
};

/// Due date for a new action: today plus the configured offset, pulled in
/// to the plan due date when that is still ahead.
pub fn default_due_date(plan: &AuditPlan, today: NaiveDate, due_days: i64) -> NaiveDate {
    let due = today + Duration::days(due_days);
    if plan.due_date > today && plan.due_date < due {
        plan.due_date
    } else {
        due
    }
}

/// Creates, transitions and sweeps corrective actions.
#[derive(Debug, Clone)]
pub struct CorrectiveActionService {
    ctx: AuditContext,
    resolution: ResolutionEngine,
    notifier: CorrectiveActionNotifier,
}

impl CorrectiveActionService {
    pub fn new(ctx: AuditContext) -> Self {
        Self {
            resolution: ResolutionEngine::new(ctx.clone()),
            notifier: CorrectiveActionNotifier::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn find(&self, id: i64) -> AuditResult<CorrectiveAction> {
        self.ctx
            .store
            .find_corrective_action(id)
            .await?
            .ok_or_else(|| AuditError::not_found(format!("Corrective action {}", id)))
    }

    pub async fn list_for_plan(&self, audit_plan_id: i64) -> AuditResult<Vec<CorrectiveAction>> {
        Ok(self.ctx.store.corrective_actions_for_plan(audit_plan_id).await?)
    }

    /// Manual creation followed by an individual notification.
    pub async fn create(
        &self,
        request: CreateCorrectiveActionRequest,
        actor: Option<i64>,
    ) -> AuditResult<CorrectiveAction> {
        let mut errors = match request.validate() {
            Ok(()) => Vec::new(),
            Err(e) => collect_messages(&e),
        };
        let reported = |prefix: &str| errors.iter().any(|m: &String| m.starts_with(prefix));
        let blank_issue = validate_not_blank(&request.issue).is_err() && !reported("Issue");
        let blank_action = validate_not_blank(&request.action).is_err() && !reported("Action");
        if blank_issue {
            errors.push("Issue must be 1-2000 characters".to_string());
        }
        if blank_action {
            errors.push("Action must be 1-2000 characters".to_string());
        }
        if let Some(assignee) = request.assigned_to {
            if self.ctx.store.find_employee(assignee).await?.is_none() {
                errors.push(format!("Unknown assignee id: {}", assignee));
            }
        }
        if !errors.is_empty() {
            return Err(AuditError::Validation(join_messages(&errors)));
        }

        let audit_asset = self.load_audit_asset(request.audit_asset_id).await?;
        if audit_asset.resolved {
            return Err(AuditError::conflict(format!(
                "Audit asset {} is already resolved",
                audit_asset.id
            )));
        }
        let plan = self.load_plan(audit_asset.audit_plan_id).await?;
        let now = self.ctx.clock.now();
        let due_date = request.due_date.unwrap_or_else(|| {
            default_due_date(&plan, now.date_naive(), self.ctx.settings.corrective_action_due_days)
        });

        let mut notes = NotesLog::new();
        if let Some(note) = request.notes.as_deref() {
            notes.append(now, note);
        }

        let assignment = self
            .responsible_assignment(&audit_asset, request.assigned_to)
            .await?;
        let new = NewCorrectiveAction {
            audit_asset_id: audit_asset.id,
            audit_plan_id: audit_asset.audit_plan_id,
            issue: request.issue.trim().to_string(),
            action: request.action.trim().to_string(),
            assigned_to: request.assigned_to,
            priority: request.priority.unwrap_or(ActionPriority::Medium),
            due_date,
            notes,
            created_at: now,
        };
        let action = self.insert(new, assignment, actor).await?;
        self.notifier.send_corrective_action_notification(&action).await;
        Ok(action)
    }

    /// Raises one action for a discrepancy found by a submission.
    ///
    /// Does nothing when the audit asset shows no discrepancy or already has
    /// an open action. Assigned to the location's auditor, else the
    /// submitter.
    pub async fn raise_for_discrepancy(
        &self,
        audit_asset: &AuditAsset,
        plan: &AuditPlan,
        submitted_by: i64,
    ) -> AuditResult<Option<CorrectiveAction>> {
        let Some(discrepancy) = Discrepancy::of(audit_asset) else {
            return Ok(None);
        };
        let open = self
            .ctx
            .store
            .count_incomplete_corrective_actions(audit_asset.id)
            .await?;
        if open > 0 {
            info!(
                audit_asset_id = audit_asset.id,
                open,
                "Audit asset already has open corrective actions"
            );
            return Ok(None);
        }

        let assignment = self.responsible_assignment(audit_asset, None).await?;
        let assigned_to = assignment
            .as_ref()
            .map(|a| a.auditor_id)
            .unwrap_or(submitted_by);

        let now = self.ctx.clock.now();
        let (issue, remedy) = discrepancy.describe(audit_asset);
        let mut notes = NotesLog::new();
        notes.append(
            now,
            format!("Raised from audit submission by employee {}", submitted_by),
        );

        let new = NewCorrectiveAction {
            audit_asset_id: audit_asset.id,
            audit_plan_id: plan.id,
            issue,
            action: remedy,
            assigned_to: Some(assigned_to),
            priority: discrepancy.priority(),
            due_date: default_due_date(
                plan,
                now.date_naive(),
                self.ctx.settings.corrective_action_due_days,
            ),
            notes,
            created_at: now,
        };
        let action = self.insert(new, assignment, Some(submitted_by)).await?;
        self.notifier.send_corrective_action_notification(&action).await;
        Ok(Some(action))
    }

    /// Moves an action to `status`, mirrors the change onto its assignment
    /// and, on completion, runs resolution for its audit asset.
    ///
    /// Completed actions cannot be reopened.
    pub async fn update_status(
        &self,
        id: i64,
        status: ActionStatus,
        note: Option<&str>,
        actor: Option<i64>,
    ) -> AuditResult<CorrectiveAction> {
        let mut action = self.find(id).await?;
        let previous = action.status;
        if previous == ActionStatus::Completed && status != ActionStatus::Completed {
            return Err(AuditError::conflict(format!(
                "Corrective action {} is completed and cannot move to {}",
                id, status
            )));
        }

        let now = self.ctx.clock.now();
        if !action.transition(status, now, note) {
            return Ok(action);
        }

        let mut assignment = self.ctx.store.find_action_assignment(action.id).await?;
        if let Some(assignment) = assignment.as_mut() {
            assignment.mirror(status, now, note);
        }
        self.ctx
            .store
            .update_corrective_action(&action, assignment.as_ref())
            .await?;

        if previous != status {
            self.ctx
                .store
                .append_audit_log(audit_helpers::corrective_action_status_changed(
                    actor, action.id, previous, status, now,
                ))
                .await?;
            info!(
                corrective_action_id = action.id,
                from = %previous,
                to = %status,
                "Corrective action status changed"
            );
        }

        if status == ActionStatus::Completed && previous != ActionStatus::Completed {
            self.cascade_resolution(&action, actor).await?;
        }
        Ok(action)
    }

    pub async fn complete(
        &self,
        id: i64,
        note: Option<&str>,
        actor: Option<i64>,
    ) -> AuditResult<CorrectiveAction> {
        self.update_status(id, ActionStatus::Completed, note, actor).await
    }

    /// Applies one status to many actions. Each id succeeds or fails on its
    /// own.
    pub async fn bulk_update_status(
        &self,
        request: BulkStatusUpdateRequest,
        actor: Option<i64>,
    ) -> AuditResult<BulkStatusUpdateResponse> {
        request
            .validate()
            .map_err(|e| AuditError::Validation(join_messages(&collect_messages(&e))))?;

        let mut seen = std::collections::HashSet::new();
        let mut results = Vec::with_capacity(request.ids.len());
        for id in request.ids.iter().copied().filter(|id| seen.insert(*id)) {
            match self
                .update_status(id, request.status, request.notes.as_deref(), actor)
                .await
            {
                Ok(_) => results.push(BulkStatusItemResult {
                    id,
                    success: true,
                    error: None,
                }),
                Err(e) => {
                    warn!(corrective_action_id = id, error = %e, "Bulk status update failed for action");
                    results.push(BulkStatusItemResult {
                        id,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let updated = results.iter().filter(|r| r.success).count();
        Ok(BulkStatusUpdateResponse {
            updated,
            failed: results.len() - updated,
            results,
        })
    }

    /// Marks every pending or in-progress action past its due date overdue.
    pub async fn mark_overdue_actions(&self) -> AuditResult<Vec<CorrectiveAction>> {
        let today = self.ctx.clock.today();
        let candidates = self.ctx.store.overdue_corrective_actions(today).await?;

        let mut marked = Vec::new();
        for action in candidates.into_iter().filter(|a| a.is_active()) {
            let note = format!("Due date {} has passed", action.due_date);
            match self
                .update_status(action.id, ActionStatus::Overdue, Some(&note), None)
                .await
            {
                Ok(updated) => marked.push(updated),
                Err(e) => warn!(
                    corrective_action_id = action.id,
                    error = %e,
                    "Could not mark corrective action overdue"
                ),
            }
        }
        if !marked.is_empty() {
            info!(count = marked.len(), "Marked corrective actions overdue");
        }
        Ok(marked)
    }

    /// Status the canonical asset would take if the action's audit asset
    /// resolved now.
    pub async fn get_resolution_status(&self, id: i64) -> AuditResult<AssetStatus> {
        let action = self.find(id).await?;
        let audit_asset = self.load_audit_asset(action.audit_asset_id).await?;
        Ok(resolution_status_for(&audit_asset))
    }

    pub async fn notify(&self, id: i64) -> AuditResult<bool> {
        let action = self.find(id).await?;
        Ok(self.notifier.send_corrective_action_notification(&action).await)
    }

    async fn cascade_resolution(&self, action: &CorrectiveAction, actor: Option<i64>) -> AuditResult<()> {
        let audit_asset = self.load_audit_asset(action.audit_asset_id).await?;
        if audit_asset.resolved {
            return Ok(());
        }
        match self.resolution.update_main_asset(&audit_asset, actor).await? {
            ResolutionOutcome::Resolved(asset) => info!(
                corrective_action_id = action.id,
                asset_id = asset.id,
                "Completing corrective action resolved its audit asset"
            ),
            ResolutionOutcome::PendingActions(open) => info!(
                corrective_action_id = action.id,
                open,
                "Audit asset still has open corrective actions"
            ),
            ResolutionOutcome::NotAudited => warn!(
                corrective_action_id = action.id,
                audit_asset_id = audit_asset.id,
                "Corrective action completed on an unaudited asset"
            ),
        }
        Ok(())
    }

    async fn insert(
        &self,
        new: NewCorrectiveAction,
        assignment: Option<AuditAssignment>,
        actor: Option<i64>,
    ) -> AuditResult<CorrectiveAction> {
        let binding = assignment.map(|a| NewCorrectiveActionAssignment {
            audit_assignment_id: a.id,
            auditor_id: a.auditor_id,
            created_at: new.created_at,
        });
        let (action, _) = self
            .ctx
            .store
            .insert_corrective_action(new, binding)
            .await?;

        self.ctx
            .store
            .append_audit_log(audit_helpers::corrective_action_created(
                actor,
                action.id,
                action.audit_asset_id,
                action.assigned_to,
                action.created_at,
            ))
            .await?;
        info!(
            corrective_action_id = action.id,
            audit_asset_id = action.audit_asset_id,
            assigned_to = ?action.assigned_to,
            priority = %action.priority,
            "Corrective action created"
        );
        Ok(action)
    }

    /// The plan assignment covering the audit asset's location, preferring
    /// one held by `preferred_auditor`.
    async fn responsible_assignment(
        &self,
        audit_asset: &AuditAsset,
        preferred_auditor: Option<i64>,
    ) -> AuditResult<Option<AuditAssignment>> {
        let assignments = self
            .ctx
            .store
            .assignments_for_plan(audit_asset.audit_plan_id)
            .await?;
        let location_ids: Vec<i64> = assignments.iter().map(|a| a.location_id).collect();
        let locations = self.ctx.store.find_locations(&location_ids).await?;
        let covering: Vec<AuditAssignment> = assignments
            .into_iter()
            .filter(|a| {
                locations
                    .iter()
                    .any(|l| l.id == a.location_id && l.name == audit_asset.original_location)
            })
            .collect();

        let preferred = preferred_auditor
            .and_then(|id| covering.iter().find(|a| a.auditor_id == id).cloned());
        Ok(preferred.or_else(|| covering.into_iter().next()))
    }

    async fn load_audit_asset(&self, id: i64) -> AuditResult<AuditAsset> {
        self.ctx
            .store
            .find_audit_asset(id)
            .await?
            .ok_or_else(|| AuditError::not_found(format!("Audit asset {}", id)))
    }

    async fn load_plan(&self, id: i64) -> AuditResult<AuditPlan> {
        self.ctx
            .store
            .find_audit_plan(id)
            .await?
            .ok_or_else(|| AuditError::not_found(format!("Audit plan {}", id)))
    }
}
