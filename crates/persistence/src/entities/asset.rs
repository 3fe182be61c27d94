//! Asset entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Asset, NotesLog};
use domain::store::StoreError;
use sqlx::types::Json;
use sqlx::FromRow;

use super::decode;

/// Database row mapping for the assets table.
#[derive(Debug, Clone, FromRow)]
pub struct AssetEntity {
    pub id: i64,
    pub asset_code: String,
    pub asset_type: String,
    pub location: String,
    /// Japanese form.
    pub status: String,
    pub user_id: Option<i64>,
    pub notes: Json<NotesLog>,
    pub last_updated: Option<DateTime<Utc>>,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AssetEntity> for Asset {
    type Error = StoreError;

    fn try_from(entity: AssetEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            asset_code: entity.asset_code,
            asset_type: entity.asset_type,
            location: entity.location,
            status: decode("assets.status", &entity.status)?,
            user_id: entity.user_id,
            notes: entity.notes.0,
            last_updated: entity.last_updated,
            updated_by: entity.updated_by,
            updated_at: entity.updated_at,
        })
    }
}
