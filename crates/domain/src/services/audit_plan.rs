//! Audit plan creation, progress and completion.

use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};
use validator::Validate;

use shared::validation::{
    collect_messages, join_messages, validate_date_order, validate_not_blank,
};

use super::audit::audit_helpers;
use super::audit_notification::AuditNotificationService;
use super::context::AuditContext;
use super::resolution::{Discrepancy, ResolutionEngine, ResolutionOutcome};
use crate::error::{AuditError, AuditResult};
use crate::models::audit_assignment::cross_product;
use crate::models::audit_plan::{
    AuditPlanCreatedResponse, AuditPlanStatistics, CreateAuditPlanRequest, LocationStatistics,
};
use crate::models::corrective_action::CorrectiveActionCounts;
use crate::models::{AuditPlan, AuditPlanStatus, Employee, Location, NewAuditAsset, NewAuditPlan};
use crate::store::AuditPlanFanOut;

/// Result of completing a plan.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPlanCompletion {
    pub plan: AuditPlan,
    /// Audit assets written back by this call.
    pub resolved_assets: usize,
    /// Audited assets left unresolved because actions are still open.
    pub pending_assets: usize,
    pub already_completed: bool,
}

#[derive(Debug, Clone)]
pub struct AuditPlanService {
    ctx: AuditContext,
    notifications: AuditNotificationService,
    resolution: ResolutionEngine,
}

impl AuditPlanService {
    pub fn new(ctx: AuditContext) -> Self {
        Self {
            notifications: AuditNotificationService::new(ctx.clone()),
            resolution: ResolutionEngine::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn find_plan(&self, id: i64) -> AuditResult<AuditPlan> {
        self.ctx
            .store
            .find_audit_plan(id)
            .await?
            .ok_or_else(|| AuditError::not_found(format!("Audit plan {}", id)))
    }

    /// Creates a plan together with its assignments and asset snapshots.
    ///
    /// All validation failures are reported together. The plan, its
    /// assignments, its snapshots and the log entry are written in one unit;
    /// kickoff mail goes out afterwards and never fails the call.
    pub async fn create_audit_plan(
        &self,
        request: CreateAuditPlanRequest,
        created_by: Option<i64>,
    ) -> AuditResult<AuditPlanCreatedResponse> {
        let (locations, auditors) = self.validate(&request).await?;

        let location_ids: Vec<i64> = locations.iter().map(|l| l.id).collect();
        let auditor_ids: Vec<i64> = auditors.iter().map(|e| e.id).collect();
        let location_names: Vec<String> = locations.iter().map(|l| l.name.clone()).collect();

        let assets = self.ctx.store.assets_in_locations(&location_names).await?;
        let owner_ids: Vec<i64> = assets.iter().filter_map(|a| a.user_id).collect();
        let owners: HashMap<i64, String> = self
            .ctx
            .store
            .find_employees(&owner_ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect();
        let snapshots: Vec<NewAuditAsset> = assets
            .iter()
            .map(|asset| {
                let owner_name = asset.user_id.and_then(|id| owners.get(&id).cloned());
                NewAuditAsset::snapshot(asset, owner_name)
            })
            .collect();

        if snapshots.is_empty() {
            warn!(
                plan_name = %request.name,
                locations = ?location_names,
                "No assets found in the selected locations, creating an empty audit plan"
            );
        }

        let now = self.ctx.clock.now();
        let name = request.name.trim().to_string();
        let log = audit_helpers::plan_created(
            created_by,
            &name,
            location_ids.len(),
            snapshots.len(),
            now,
        );
        let fan_out = AuditPlanFanOut {
            plan: NewAuditPlan {
                name,
                description: request.description.filter(|d| !d.trim().is_empty()),
                start_date: request.start_date,
                due_date: request.due_date,
                created_by,
                created_at: now,
            },
            assignments: cross_product(&location_ids, &auditor_ids),
            snapshots,
            log,
        };
        let created = self.ctx.store.create_audit_plan(fan_out).await?;

        info!(
            audit_plan_id = created.plan.id,
            plan_name = %created.plan.name,
            assignments = created.assignments.len(),
            audit_assets = created.audit_assets.len(),
            "Audit plan created"
        );

        let notifications_sent = match self
            .notifications
            .send_initial_notifications(&created.plan, &auditor_ids, &location_ids)
            .await
        {
            Ok(sent) => sent,
            Err(e) => {
                warn!(
                    audit_plan_id = created.plan.id,
                    error = %e,
                    "Failed to send audit kickoff notifications"
                );
                0
            }
        };

        Ok(AuditPlanCreatedResponse {
            assignment_count: created.assignments.len(),
            audit_asset_count: created.audit_assets.len(),
            notifications_sent,
            plan: created.plan,
        })
    }

    /// Progress counts for one plan, overall and per location.
    pub async fn statistics(&self, audit_plan_id: i64) -> AuditResult<AuditPlanStatistics> {
        let plan = self.find_plan(audit_plan_id).await?;
        let audit_assets = self.ctx.store.audit_assets_for_plan(audit_plan_id).await?;
        let actions = self
            .ctx
            .store
            .corrective_actions_for_plan(audit_plan_id)
            .await?;

        let total_assets = audit_assets.len();
        let audited_assets = audit_assets.iter().filter(|a| a.is_audited()).count();
        let resolved_assets = audit_assets.iter().filter(|a| a.resolved).count();
        let discrepancies = audit_assets
            .iter()
            .filter(|a| a.is_audited() && Discrepancy::of(a).is_some())
            .count();

        let mut by_location: BTreeMap<String, LocationStatistics> = BTreeMap::new();
        for audit_asset in &audit_assets {
            let entry = by_location
                .entry(audit_asset.original_location.clone())
                .or_insert_with(|| LocationStatistics {
                    location: audit_asset.original_location.clone(),
                    total: 0,
                    audited: 0,
                    resolved: 0,
                });
            entry.total += 1;
            if audit_asset.is_audited() {
                entry.audited += 1;
            }
            if audit_asset.resolved {
                entry.resolved += 1;
            }
        }

        Ok(AuditPlanStatistics {
            audit_plan_id,
            status: plan.status,
            total_assets,
            audited_assets,
            unaudited_assets: total_assets - audited_assets,
            resolved_assets,
            discrepancies,
            completion_rate: completion_rate(audited_assets, total_assets),
            corrective_actions: CorrectiveActionCounts::tally(&actions),
            locations: by_location.into_values().collect(),
        })
    }

    /// Closes a plan.
    ///
    /// Audited assets whose actions are all complete are written back first.
    /// Completing an already completed plan changes nothing.
    pub async fn complete_audit_plan(
        &self,
        audit_plan_id: i64,
        actor: Option<i64>,
    ) -> AuditResult<AuditPlanCompletion> {
        let plan = self.find_plan(audit_plan_id).await?;
        if plan.status == AuditPlanStatus::Completed {
            return Ok(AuditPlanCompletion {
                plan,
                resolved_assets: 0,
                pending_assets: 0,
                already_completed: true,
            });
        }

        let mut resolved_assets = 0;
        let mut pending_assets = 0;
        for audit_asset in self.ctx.store.audit_assets_for_plan(audit_plan_id).await? {
            if audit_asset.resolved || !audit_asset.is_audited() {
                continue;
            }
            match self.resolution.update_main_asset(&audit_asset, actor).await? {
                ResolutionOutcome::Resolved(_) => resolved_assets += 1,
                ResolutionOutcome::PendingActions(_) => pending_assets += 1,
                ResolutionOutcome::NotAudited => {}
            }
        }

        let changed = self
            .ctx
            .store
            .update_audit_plan_status(audit_plan_id, None, AuditPlanStatus::Completed)
            .await?;
        if changed {
            self.ctx
                .store
                .append_audit_log(audit_helpers::plan_completed(
                    actor,
                    audit_plan_id,
                    self.ctx.clock.now(),
                ))
                .await?;
            info!(
                audit_plan_id,
                resolved_assets, pending_assets, "Audit plan completed"
            );
        }

        Ok(AuditPlanCompletion {
            plan: self.find_plan(audit_plan_id).await?,
            resolved_assets,
            pending_assets,
            already_completed: !changed,
        })
    }

    /// Collects every problem with the request before reporting.
    async fn validate(
        &self,
        request: &CreateAuditPlanRequest,
    ) -> AuditResult<(Vec<Location>, Vec<Employee>)> {
        let mut errors = Vec::new();
        if validate_not_blank(&request.name).is_err() {
            errors.push("Audit plan name is required".to_string());
        }
        if let Err(e) = request.validate() {
            errors.extend(collect_messages(&e));
        }
        if let Err(e) = validate_date_order(request.start_date, request.due_date) {
            errors.push(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            );
        }

        let locations = self.ctx.store.find_locations(&request.location_ids).await?;
        let unknown_locations = missing_ids(&request.location_ids, locations.iter().map(|l| l.id));
        if !unknown_locations.is_empty() {
            errors.push(format!("Unknown location id(s): {}", unknown_locations));
        }

        let auditors = self.ctx.store.find_employees(&request.auditor_ids).await?;
        let unknown_auditors = missing_ids(&request.auditor_ids, auditors.iter().map(|e| e.id));
        if !unknown_auditors.is_empty() {
            errors.push(format!("Unknown auditor id(s): {}", unknown_auditors));
        }

        if errors.is_empty() {
            Ok((locations, auditors))
        } else {
            Err(AuditError::Validation(join_messages(&errors)))
        }
    }
}

fn completion_rate(audited: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        audited as f64 / total as f64
    }
}

/// Requested ids absent from `found`, comma separated, in request order.
fn missing_ids(requested: &[i64], found: impl Iterator<Item = i64>) -> String {
    let found: Vec<i64> = found.collect();
    let mut missing: Vec<String> = Vec::new();
    for id in requested {
        let label = id.to_string();
        if !found.contains(id) && !missing.contains(&label) {
            missing.push(label);
        }
    }
    missing.join(", ")
}
