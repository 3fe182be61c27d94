//! Audit asset entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::AuditAsset;
use domain::store::StoreError;
use sqlx::FromRow;

use super::decode;

/// Database row mapping for the audit_assets table.
///
/// `current_user` is a reserved word in PostgreSQL, hence the column name.
#[derive(Debug, Clone, FromRow)]
pub struct AuditAssetEntity {
    pub id: i64,
    pub audit_plan_id: i64,
    pub asset_id: i64,
    pub original_location: String,
    pub original_user: Option<String>,
    pub original_status: String,
    pub current_status: String,
    pub current_location: String,
    pub current_user_name: Option<String>,
    pub auditor_notes: Option<String>,
    pub audited_at: Option<DateTime<Utc>>,
    pub audited_by: Option<i64>,
    pub audit_status: bool,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AuditAssetEntity> for AuditAsset {
    type Error = StoreError;

    fn try_from(entity: AuditAssetEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            audit_plan_id: entity.audit_plan_id,
            asset_id: entity.asset_id,
            original_location: entity.original_location,
            original_user: entity.original_user,
            original_status: decode("audit_assets.original_status", &entity.original_status)?,
            current_status: decode("audit_assets.current_status", &entity.current_status)?,
            current_location: entity.current_location,
            current_user: entity.current_user_name,
            auditor_notes: entity.auditor_notes,
            audited_at: entity.audited_at,
            audited_by: entity.audited_by,
            audit_status: entity.audit_status,
            resolved: entity.resolved,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}
