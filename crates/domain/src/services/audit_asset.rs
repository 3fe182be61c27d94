//! Audit asset submissions and visibility.

use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use super::audit::audit_helpers;
use super::context::AuditContext;
use super::corrective_action::CorrectiveActionService;
use super::resolution::ResolutionEngine;
use crate::error::{AuditError, AuditResult};
use crate::models::audit_asset::AuditAssetView;
use crate::models::{
    AccessGrant, Asset, AssetPatch, AssetStatus, AuditAsset, AuditPlan, AuditPlanStatus,
    CorrectiveAction, StatusUpdateRequest,
};
use crate::store::{AuditSubmission, SubmissionOutcome};

/// What a submission changed.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub audit_asset: AuditAsset,
    /// Raised when the submission reported a discrepancy.
    pub corrective_action: Option<CorrectiveAction>,
}

/// Which audit assets an employee may see and act on within one plan.
#[derive(Debug, Clone, Default)]
struct Visibility {
    auditor_locations: HashSet<String>,
    owned_assets: HashSet<i64>,
}

impl Visibility {
    fn covers(&self, audit_asset: &AuditAsset) -> bool {
        self.auditor_locations.contains(&audit_asset.original_location)
            || self.owned_assets.contains(&audit_asset.asset_id)
    }
}

/// Employee and auditor operations on audit assets.
#[derive(Debug, Clone)]
pub struct AuditAssetService {
    ctx: AuditContext,
    resolution: ResolutionEngine,
    corrective_actions: CorrectiveActionService,
}

impl AuditAssetService {
    pub fn new(ctx: AuditContext) -> Self {
        Self {
            resolution: ResolutionEngine::new(ctx.clone()),
            corrective_actions: CorrectiveActionService::new(ctx.clone()),
            ctx,
        }
    }

    /// Records an employee or auditor status submission.
    ///
    /// Rejects resolved audit assets and reassignments onto assets that
    /// already have a user. The canonical asset's status always mirrors the
    /// submission; its user is written only for an accepted reassignment.
    pub async fn submit_status(
        &self,
        grant: &AccessGrant,
        request: &StatusUpdateRequest,
    ) -> AuditResult<SubmissionResult> {
        let employee_id = grant.employee_id;
        let status = AssetStatus::parse(&request.status).ok_or_else(|| {
            AuditError::Validation(format!("Invalid asset status: {}", request.status))
        })?;

        let audit_asset = self.load_audit_asset(request.asset_id).await?;
        if audit_asset.audit_plan_id != grant.audit_plan_id {
            return Err(AuditError::not_found(format!("Audit asset {}", request.asset_id)));
        }
        if audit_asset.resolved {
            return Err(AuditError::conflict(format!(
                "Audit asset {} is already resolved",
                audit_asset.id
            )));
        }
        let plan = self.load_plan(audit_asset.audit_plan_id).await?;
        if plan.status == AuditPlanStatus::Completed {
            return Err(AuditError::conflict(format!(
                "Audit plan {} is completed",
                plan.id
            )));
        }

        let asset = self.load_asset(audit_asset.asset_id).await?;
        let visibility = self.visibility(plan.id, employee_id).await?;
        if !visibility.covers(&audit_asset) {
            return Err(AuditError::forbidden(format!(
                "Employee {} may not audit asset {}",
                employee_id, audit_asset.id
            )));
        }

        let now = self.ctx.clock.now();
        let mut updated = audit_asset.clone();
        let mut patch = AssetPatch::new(now).status(status);

        if let Some(new_user_id) = request.reassign_user_id {
            let has_current_user = audit_asset
                .current_user
                .as_deref()
                .is_some_and(|u| !u.trim().is_empty());
            if asset.is_assigned() || has_current_user {
                return Err(AuditError::conflict(format!(
                    "Asset {} is already assigned to a user",
                    asset.id
                )));
            }
            let new_user = self
                .ctx
                .store
                .find_employee(new_user_id)
                .await?
                .ok_or_else(|| AuditError::not_found(format!("Employee {}", new_user_id)))?;
            updated.current_user = Some(new_user.name);
            patch = patch.reassign_to(new_user_id);
        }

        updated.current_status = status;
        updated.auditor_notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or(updated.auditor_notes);
        updated.audited_at = Some(now);
        updated.audited_by = Some(employee_id);
        updated.audit_status = true;
        updated.updated_at = now;

        let submission = AuditSubmission {
            audit_asset: updated.clone(),
            asset_patch: patch,
        };
        match self.ctx.store.record_audit_submission(&submission).await? {
            SubmissionOutcome::Recorded => {}
            SubmissionOutcome::AlreadyResolved => {
                return Err(AuditError::conflict(format!(
                    "Audit asset {} is already resolved",
                    audit_asset.id
                )));
            }
            SubmissionOutcome::AlreadyAssigned => {
                return Err(AuditError::conflict(format!(
                    "Asset {} is already assigned to a user",
                    asset.id
                )));
            }
        }

        self.ctx
            .store
            .append_audit_log(audit_helpers::audit_asset_submitted(
                employee_id,
                updated.id,
                audit_asset.current_status,
                status,
                now,
            ))
            .await?;
        info!(
            audit_plan_id = plan.id,
            audit_asset_id = updated.id,
            employee_id,
            status = %status,
            reassigned = request.reassign_user_id.is_some(),
            "Audit status submitted"
        );

        if plan.status == AuditPlanStatus::Planning
            && self
                .ctx
                .store
                .update_audit_plan_status(
                    plan.id,
                    Some(AuditPlanStatus::Planning),
                    AuditPlanStatus::InProgress,
                )
                .await?
        {
            info!(audit_plan_id = plan.id, "Audit plan moved to In Progress");
        }

        let corrective_action = self
            .corrective_actions
            .raise_for_discrepancy(&updated, &plan, employee_id)
            .await?;

        Ok(SubmissionResult {
            audit_asset: updated,
            corrective_action,
        })
    }

    /// Forces resolution of an audited asset regardless of open actions.
    pub async fn mark_resolved(&self, audit_asset_id: i64, actor: Option<i64>) -> AuditResult<Asset> {
        let audit_asset = self.load_audit_asset(audit_asset_id).await?;
        if !audit_asset.is_audited() {
            return Err(AuditError::conflict(format!(
                "Audit asset {} has not been audited",
                audit_asset_id
            )));
        }
        if audit_asset.resolved {
            warn!(audit_asset_id, "Re-resolving an already resolved audit asset");
        }
        self.resolution
            .update_main_asset_directly(&audit_asset, actor)
            .await
    }

    pub async fn all_corrective_actions_completed(&self, audit_asset_id: i64) -> AuditResult<bool> {
        self.resolution
            .all_corrective_actions_completed(audit_asset_id)
            .await
    }

    /// Audit assets the employee may see: everything at locations they audit
    /// plus assets assigned to them.
    pub async fn visible_audit_assets(
        &self,
        audit_plan_id: i64,
        employee_id: i64,
    ) -> AuditResult<Vec<AuditAssetView>> {
        self.load_plan(audit_plan_id).await?;
        let visibility = self.visibility(audit_plan_id, employee_id).await?;

        let audit_assets: Vec<AuditAsset> = self
            .ctx
            .store
            .audit_assets_for_plan(audit_plan_id)
            .await?
            .into_iter()
            .filter(|a| visibility.covers(a))
            .collect();
        let asset_ids: Vec<i64> = audit_assets.iter().map(|a| a.asset_id).collect();
        let assets: HashMap<i64, Asset> = self
            .ctx
            .store
            .find_assets(&asset_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(audit_assets
            .into_iter()
            .map(|audit_asset| {
                let asset = assets.get(&audit_asset.asset_id);
                AuditAssetView {
                    state: audit_asset.state(),
                    asset_code: asset.map(|a| a.asset_code.clone()),
                    asset_type: asset.map(|a| a.asset_type.clone()),
                    audit_asset,
                }
            })
            .collect())
    }

    async fn visibility(&self, audit_plan_id: i64, employee_id: i64) -> AuditResult<Visibility> {
        let store = &self.ctx.store;
        let location_ids: Vec<i64> = store
            .assignments_for_plan(audit_plan_id)
            .await?
            .into_iter()
            .filter(|a| a.auditor_id == employee_id)
            .map(|a| a.location_id)
            .collect();
        let auditor_locations = if location_ids.is_empty() {
            HashSet::new()
        } else {
            store
                .find_locations(&location_ids)
                .await?
                .into_iter()
                .map(|l| l.name)
                .collect()
        };

        let asset_ids: Vec<i64> = store
            .audit_assets_for_plan(audit_plan_id)
            .await?
            .iter()
            .map(|a| a.asset_id)
            .collect();
        let owned_assets = store
            .find_assets(&asset_ids)
            .await?
            .into_iter()
            .filter(|a| a.user_id == Some(employee_id))
            .map(|a| a.id)
            .collect();

        Ok(Visibility {
            auditor_locations,
            owned_assets,
        })
    }

    async fn load_audit_asset(&self, id: i64) -> AuditResult<AuditAsset> {
        self.ctx
            .store
            .find_audit_asset(id)
            .await?
            .ok_or_else(|| AuditError::not_found(format!("Audit asset {}", id)))
    }

    async fn load_asset(&self, id: i64) -> AuditResult<Asset> {
        self.ctx
            .store
            .find_asset(id)
            .await?
            .ok_or_else(|| AuditError::not_found(format!("Asset {}", id)))
    }

    async fn load_plan(&self, id: i64) -> AuditResult<AuditPlan> {
        self.ctx
            .store
            .find_audit_plan(id)
            .await?
            .ok_or_else(|| AuditError::not_found(format!("Audit plan {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionPriority, AuditAssetState};
    use crate::store::AuditStore;
    use chrono::Duration;
    use crate::test_support::Fixture;

    fn grant(fx: &Fixture, employee_id: i64) -> AccessGrant {
        AccessGrant {
            employee_id,
            audit_plan_id: fx.plan_id,
            expires_at: fx.ctx.clock.now() + Duration::days(1),
        }
    }

    fn request(asset_id: i64, status: &str, reassign: Option<i64>) -> StatusUpdateRequest {
        StatusUpdateRequest {
            asset_id,
            status: status.to_string(),
            notes: None,
            reassign_user_id: reassign,
        }
    }

    #[tokio::test]
    async fn test_owner_submits_missing() {
        let fx = Fixture::with_plan().await;
        let service = AuditAssetService::new(fx.ctx.clone());
        let audit_asset = fx.audit_asset_for(100).await;

        let result = service
            .submit_status(&grant(&fx, fx.owner_id), &request(audit_asset.id, "Missing", None))
            .await
            .unwrap();

        let updated = result.audit_asset;
        assert!(updated.audited_at.is_some());
        assert!(updated.audit_status);
        assert_eq!(updated.audited_by, Some(fx.owner_id));
        assert_eq!(updated.current_status, AssetStatus::Missing);
        assert_eq!(updated.original_location, "Tokyo HQ");

        let action = result.corrective_action.unwrap();
        assert_eq!(action.priority, ActionPriority::Critical);
        assert_eq!(action.assigned_to, Some(fx.auditor_id));

        assert_eq!(fx.store.asset(100).await.unwrap().status, AssetStatus::Missing);
        let plan = fx.store.find_audit_plan(fx.plan_id).await.unwrap().unwrap();
        assert_eq!(plan.status, AuditPlanStatus::InProgress);
    }

    #[tokio::test]
    async fn test_resolved_asset_is_terminal() {
        let fx = Fixture::with_plan().await;
        let service = AuditAssetService::new(fx.ctx.clone());
        let mut audit_asset = fx.audit_asset_for(100).await;
        audit_asset.audited_at = Some(fx.ctx.clock.now());
        audit_asset.resolved = true;
        fx.store.put_audit_asset(audit_asset.clone()).await;

        let err = service
            .submit_status(&grant(&fx, fx.owner_id), &request(audit_asset.id, "Broken", None))
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::Conflict(_)));
        assert_eq!(fx.audit_asset_for(100).await, audit_asset);
    }

    #[tokio::test]
    async fn test_reassignment_rejected_when_asset_assigned() {
        let fx = Fixture::with_plan().await;
        let service = AuditAssetService::new(fx.ctx.clone());
        let audit_asset = fx.audit_asset_for(100).await;

        let err = service
            .submit_status(
                &grant(&fx, fx.auditor_id),
                &request(audit_asset.id, "In Use", Some(fx.outsider_id)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::Conflict(_)));
        assert_eq!(fx.store.asset(100).await.unwrap().user_id, Some(fx.owner_id));
        assert!(fx.audit_asset_for(100).await.audited_at.is_none());
    }

    #[tokio::test]
    async fn test_reassignment_onto_unassigned_asset() {
        let fx = Fixture::with_plan().await;
        let service = AuditAssetService::new(fx.ctx.clone());
        let audit_asset = fx.audit_asset_for(101).await;

        let result = service
            .submit_status(
                &grant(&fx, fx.auditor_id),
                &request(audit_asset.id, "利用中", Some(fx.outsider_id)),
            )
            .await
            .unwrap();

        assert_eq!(result.audit_asset.current_user.as_deref(), Some("Kato Ken"));
        assert_eq!(fx.store.asset(101).await.unwrap().user_id, Some(fx.outsider_id));
        let action = result.corrective_action.unwrap();
        assert_eq!(action.priority, ActionPriority::Low);
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let fx = Fixture::with_plan().await;
        let service = AuditAssetService::new(fx.ctx.clone());
        let audit_asset = fx.audit_asset_for(100).await;

        let err = service
            .submit_status(&grant(&fx, fx.owner_id), &request(audit_asset.id, "Lost", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Validation(_)));
    }

    #[tokio::test]
    async fn test_owner_cannot_audit_other_assets() {
        let fx = Fixture::with_plan().await;
        let service = AuditAssetService::new(fx.ctx.clone());
        let unowned = fx.audit_asset_for(101).await;

        let err = service
            .submit_status(&grant(&fx, fx.owner_id), &request(unowned.id, "In Use", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_visibility_scope() {
        let fx = Fixture::with_plan().await;
        let service = AuditAssetService::new(fx.ctx.clone());

        let auditor_view = service
            .visible_audit_assets(fx.plan_id, fx.auditor_id)
            .await
            .unwrap();
        assert_eq!(auditor_view.len(), 2);

        let owner_view = service
            .visible_audit_assets(fx.plan_id, fx.owner_id)
            .await
            .unwrap();
        assert_eq!(owner_view.len(), 1);
        assert_eq!(owner_view[0].audit_asset.asset_id, 100);
        assert_eq!(owner_view[0].asset_code.as_deref(), Some("PC-0100"));
        assert_eq!(owner_view[0].state, AuditAssetState::Unaudited);

        let outsider_view = service
            .visible_audit_assets(fx.plan_id, fx.outsider_id)
            .await
            .unwrap();
        assert!(outsider_view.is_empty());
    }

    #[tokio::test]
    async fn test_clean_submission_then_mark_resolved() {
        let fx = Fixture::with_plan().await;
        let service = AuditAssetService::new(fx.ctx.clone());
        let audit_asset = fx.audit_asset_for(100).await;

        let result = service
            .submit_status(&grant(&fx, fx.owner_id), &request(audit_asset.id, "In Use", None))
            .await
            .unwrap();
        assert!(result.corrective_action.is_none());
        assert!(service.all_corrective_actions_completed(audit_asset.id).await.unwrap());

        service.mark_resolved(audit_asset.id, Some(fx.auditor_id)).await.unwrap();
        assert_eq!(fx.audit_asset_for(100).await.state(), AuditAssetState::Resolved);
    }

    #[tokio::test]
    async fn test_mark_resolved_requires_audit() {
        let fx = Fixture::with_plan().await;
        let service = AuditAssetService::new(fx.ctx.clone());
        let audit_asset = fx.audit_asset_for(100).await;
        assert!(matches!(
            service.mark_resolved(audit_asset.id, None).await,
            Err(AuditError::Conflict(_))
        ));
    }
}
