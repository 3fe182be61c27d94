//! Writes audit findings back onto the canonical asset.

use tracing::{debug, info, warn};

use super::audit::audit_helpers;
use super::context::AuditContext;
use crate::error::{AuditError, AuditResult};
use crate::models::{ActionPriority, Asset, AssetPatch, AssetStatus, AuditAsset};
use crate::store::{ResolutionWrite, StoreError};

/// What an audit found wrong with an asset, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discrepancy {
    Missing,
    Broken,
    Abolished,
    /// Found somewhere other than the recorded location.
    Relocated,
    /// Assigned user differs from the snapshot.
    Reassigned,
}

impl Discrepancy {
    /// Classifies an audit asset. Condition issues win over location or
    /// user changes.
    pub fn of(audit_asset: &AuditAsset) -> Option<Self> {
        match audit_asset.current_status {
            AssetStatus::Missing => Some(Discrepancy::Missing),
            AssetStatus::Broken => Some(Discrepancy::Broken),
            AssetStatus::Abolished => Some(Discrepancy::Abolished),
            _ if audit_asset.location_changed() => Some(Discrepancy::Relocated),
            _ if audit_asset.user_changed() => Some(Discrepancy::Reassigned),
            _ => None,
        }
    }

    pub fn priority(&self) -> ActionPriority {
        match self {
            Discrepancy::Missing => ActionPriority::Critical,
            Discrepancy::Broken => ActionPriority::High,
            Discrepancy::Abolished | Discrepancy::Relocated => ActionPriority::Medium,
            Discrepancy::Reassigned => ActionPriority::Low,
        }
    }

    /// Issue text and remediation instruction for a raised action.
    pub fn describe(&self, audit_asset: &AuditAsset) -> (String, String) {
        match self {
            Discrepancy::Missing => (
                format!("Asset {} reported missing", audit_asset.asset_id),
                "Locate the asset or file a loss report".to_string(),
            ),
            Discrepancy::Broken => (
                format!("Asset {} reported broken", audit_asset.asset_id),
                "Arrange repair or replacement".to_string(),
            ),
            Discrepancy::Abolished => (
                format!("Asset {} reported abolished", audit_asset.asset_id),
                "Confirm disposal and update the register".to_string(),
            ),
            Discrepancy::Relocated => (
                format!(
                    "Asset {} found at {} instead of {}",
                    audit_asset.asset_id, audit_asset.current_location, audit_asset.original_location
                ),
                "Confirm the new location".to_string(),
            ),
            Discrepancy::Reassigned => (
                format!(
                    "Asset {} reassigned to {}",
                    audit_asset.asset_id,
                    audit_asset.current_user.as_deref().unwrap_or("(none)")
                ),
                "Confirm the new assignment".to_string(),
            ),
        }
    }
}

/// Status the canonical asset takes once an audit asset resolves.
///
/// Missing and Abolished go back to storage, Broken goes back to use, a
/// pure location or user change means the asset is in use. Anything else
/// keeps the audited status.
pub fn resolution_status(discrepancy: Option<Discrepancy>, current: AssetStatus) -> AssetStatus {
    match discrepancy {
        Some(Discrepancy::Missing) | Some(Discrepancy::Abolished) => AssetStatus::InStorage,
        Some(Discrepancy::Broken) => AssetStatus::InUse,
        Some(Discrepancy::Relocated) | Some(Discrepancy::Reassigned) => AssetStatus::InUse,
        None => current,
    }
}

/// Resolution status for an audit asset as it stands now.
pub fn resolution_status_for(audit_asset: &AuditAsset) -> AssetStatus {
    resolution_status(Discrepancy::of(audit_asset), audit_asset.current_status)
}

/// Why a conditional writeback did not happen.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    Resolved(Asset),
    NotAudited,
    PendingActions(i64),
}

/// Decides when and how the canonical asset is updated from an audit asset.
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    ctx: AuditContext,
}

impl ResolutionEngine {
    pub fn new(ctx: AuditContext) -> Self {
        Self { ctx }
    }

    /// True iff no corrective action on the audit asset is incomplete.
    pub async fn all_corrective_actions_completed(&self, audit_asset_id: i64) -> AuditResult<bool> {
        let incomplete = self
            .ctx
            .store
            .count_incomplete_corrective_actions(audit_asset_id)
            .await?;
        Ok(incomplete == 0)
    }

    /// Writes back only once the asset is audited and all its actions are
    /// complete.
    pub async fn update_main_asset(
        &self,
        audit_asset: &AuditAsset,
        actor: Option<i64>,
    ) -> AuditResult<ResolutionOutcome> {
        if !audit_asset.is_audited() {
            debug!(audit_asset_id = audit_asset.id, "Audit asset not audited yet");
            return Ok(ResolutionOutcome::NotAudited);
        }
        let incomplete = self
            .ctx
            .store
            .count_incomplete_corrective_actions(audit_asset.id)
            .await?;
        if incomplete > 0 {
            debug!(
                audit_asset_id = audit_asset.id,
                incomplete,
                "Corrective actions still open"
            );
            return Ok(ResolutionOutcome::PendingActions(incomplete));
        }
        let asset = self.update_main_asset_directly(audit_asset, actor).await?;
        Ok(ResolutionOutcome::Resolved(asset))
    }

    /// Unconditional writeback.
    ///
    /// Writes location, status, `last_updated`, `updated_by` and notes to the
    /// canonical asset, then marks the audit asset resolved. An audit asset
    /// that is already resolved and already reflected on the asset is left
    /// alone, with nothing written or logged.
    pub async fn update_main_asset_directly(
        &self,
        audit_asset: &AuditAsset,
        actor: Option<i64>,
    ) -> AuditResult<Asset> {
        let at = self.ctx.clock.now();
        let status = resolution_status_for(audit_asset);
        let updated_by = actor.or(audit_asset.audited_by);

        let mut patch = AssetPatch::new(at)
            .status(status)
            .location(audit_asset.current_location.clone())
            .updated_by(updated_by)
            .touch_last_updated();
        if audit_asset.location_changed() {
            patch = patch.note_once(format!(
                "Audit plan {}: location changed from {} to {}",
                audit_asset.audit_plan_id, audit_asset.original_location, audit_asset.current_location
            ));
        }
        if audit_asset.user_changed() {
            patch = patch.note_once(format!(
                "Audit plan {}: user changed from {} to {}",
                audit_asset.audit_plan_id,
                audit_asset.original_user.as_deref().unwrap_or("(none)"),
                audit_asset.current_user.as_deref().unwrap_or("(none)")
            ));
        }
        if let Some(user_id) = self.resolve_user_id(audit_asset).await? {
            patch = patch.user_id(user_id);
        }

        let written = self
            .ctx
            .store
            .write_resolution(audit_asset.id, audit_asset.asset_id, &patch)
            .await
            .map_err(|e| match e {
                StoreError::RowNotFound(_) => AuditError::not_found(format!(
                    "Asset {} or audit asset {}",
                    audit_asset.asset_id, audit_asset.id
                )),
                other => other.into(),
            })?;
        let (previous_status, asset) = match written {
            ResolutionWrite::Applied { previous_status, asset } => (previous_status, asset),
            ResolutionWrite::Unchanged(asset) => {
                debug!(
                    audit_asset_id = audit_asset.id,
                    asset_id = asset.id,
                    "Audit asset already resolved onto canonical asset"
                );
                return Ok(asset);
            }
        };

        self.ctx
            .store
            .append_audit_log(audit_helpers::audit_asset_resolved(
                updated_by,
                audit_asset.id,
                asset.id,
                previous_status,
                status,
                at,
            ))
            .await?;

        info!(
            audit_asset_id = audit_asset.id,
            asset_id = asset.id,
            status = %status,
            "Resolved audit asset onto canonical asset"
        );
        Ok(asset)
    }

    /// Maps the audited user onto an employee id.
    ///
    /// A numeric value is taken as an id; anything else is looked up by exact
    /// name. A miss leaves `user_id` alone.
    async fn resolve_user_id(&self, audit_asset: &AuditAsset) -> AuditResult<Option<i64>> {
        let user = audit_asset
            .current_user
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .or_else(|| {
                audit_asset
                    .original_user
                    .as_deref()
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
            });
        let Some(user) = user else {
            return Ok(None);
        };

        if let Ok(id) = user.parse::<i64>() {
            return Ok(Some(id));
        }
        match self.ctx.store.find_employee_by_name(user).await? {
            Some(employee) => Ok(Some(employee.id)),
            None => {
                warn!(
                    audit_asset_id = audit_asset.id,
                    user = %user,
                    "Could not resolve audited user to an employee, keeping user_id"
                );
                Ok(None)
            }
        }
    }
}
