//! Audit asset: the per-plan audited snapshot of one canonical asset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::asset::Asset;
use super::asset_status::AssetStatus;

/// Where an audit asset is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAssetState {
    /// Nobody has submitted a status yet.
    Unaudited,
    /// A status was submitted; findings not yet written back.
    Audited,
    /// The canonical asset reflects the findings. Terminal.
    Resolved,
}

/// The audited unit.
///
/// `original_*` fields are snapshots taken at plan creation and never change;
/// `current_*` fields are the only mutable channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditAsset {
    pub id: i64,
    pub audit_plan_id: i64,
    pub asset_id: i64,
    pub original_location: String,
    pub original_user: Option<String>,
    pub original_status: AssetStatus,
    pub current_status: AssetStatus,
    pub current_location: String,
    pub current_user: Option<String>,
    pub auditor_notes: Option<String>,
    pub audited_at: Option<DateTime<Utc>>,
    pub audited_by: Option<i64>,
    pub audit_status: bool,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditAsset {
    pub fn state(&self) -> AuditAssetState {
        if self.resolved {
            AuditAssetState::Resolved
        } else if self.audited_at.is_some() {
            AuditAssetState::Audited
        } else {
            AuditAssetState::Unaudited
        }
    }

    pub fn is_audited(&self) -> bool {
        self.audited_at.is_some()
    }

    pub fn location_changed(&self) -> bool {
        self.current_location.trim() != self.original_location.trim()
    }

    pub fn user_changed(&self) -> bool {
        normalize_user(self.current_user.as_deref()) != normalize_user(self.original_user.as_deref())
    }
}

fn normalize_user(user: Option<&str>) -> Option<&str> {
    user.map(str::trim).filter(|u| !u.is_empty())
}

/// Snapshot row inserted at plan creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditAsset {
    pub asset_id: i64,
    pub location: String,
    pub user: Option<String>,
    pub status: AssetStatus,
}

impl NewAuditAsset {
    /// Captures the asset's current state; `owner_name` is the assigned
    /// employee's name, if any.
    pub fn snapshot(asset: &Asset, owner_name: Option<String>) -> Self {
        Self {
            asset_id: asset.id,
            location: asset.location.clone(),
            user: owner_name,
            status: asset.status,
        }
    }
}

/// Employee/auditor status submission for one audit asset.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    /// Audit asset id.
    pub asset_id: i64,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub reassign_user_id: Option<i64>,
}

/// Audit asset view returned to the employee portal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditAssetView {
    #[serde(flatten)]
    pub audit_asset: AuditAsset,
    pub state: AuditAssetState,
    pub asset_code: Option<String>,
    pub asset_type: Option<String>,
}
