//! Asset repository for database operations.

use domain::models::{Asset, AssetPatch};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::entities::AssetEntity;
use crate::metrics::QueryTimer;

const ASSET_COLUMNS: &str =
    "id, asset_code, asset_type, location, status, user_id, notes, last_updated, updated_by, updated_at";

/// Repository for canonical asset records.
#[derive(Clone)]
pub struct AssetRepository {
    pool: PgPool,
}

impl AssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<AssetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_asset_by_id");
        let result = sqlx::query_as::<_, AssetEntity>(&format!(
            "SELECT {} FROM assets WHERE id = $1",
            ASSET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<AssetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_assets_by_ids");
        let result = sqlx::query_as::<_, AssetEntity>(&format!(
            "SELECT {} FROM assets WHERE id = ANY($1) ORDER BY id",
            ASSET_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Assets whose location name is one of `names`.
    pub async fn find_in_locations(&self, names: &[String]) -> Result<Vec<AssetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_assets_in_locations");
        let result = sqlx::query_as::<_, AssetEntity>(&format!(
            "SELECT {} FROM assets WHERE location = ANY($1) ORDER BY id",
            ASSET_COLUMNS
        ))
        .bind(names)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Locks the asset row and returns its current user.
    ///
    /// `None` means the asset does not exist; `Some(None)` means it is
    /// unassigned.
    pub(crate) async fn lock_user(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Option<i64>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i64>>("SELECT user_id FROM assets WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Locks the whole asset row for a read-merge-write.
    pub(crate) async fn lock_by_id(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<AssetEntity>, sqlx::Error> {
        sqlx::query_as::<_, AssetEntity>(&format!(
            "SELECT {} FROM assets WHERE id = $1 FOR UPDATE",
            ASSET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Writes every mutable column of an asset whose row the caller holds
    /// locked.
    pub(crate) async fn store_locked(conn: &mut PgConnection, asset: &Asset) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE assets
            SET status = $2,
                location = $3,
                user_id = $4,
                notes = $5,
                updated_by = $6,
                last_updated = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(asset.id)
        .bind(asset.status.japanese())
        .bind(&asset.location)
        .bind(asset.user_id)
        .bind(Json(&asset.notes))
        .bind(asset.updated_by)
        .bind(asset.last_updated)
        .bind(asset.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Applies a patch's column fields inside the caller's transaction.
    ///
    /// Note lines are not written here; they need the locked notes log and
    /// go through [`AssetRepository::store_locked`]. A reassigning patch only
    /// lands while the asset has no user. Returns whether a row changed.
    pub(crate) async fn apply_patch(
        conn: &mut PgConnection,
        id: i64,
        patch: &AssetPatch,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE assets
            SET status = COALESCE($2, status),
                location = COALESCE($3, location),
                user_id = COALESCE($4, user_id),
                updated_by = COALESCE($5, updated_by),
                last_updated = CASE WHEN $6 THEN $7 ELSE last_updated END,
                updated_at = $7
            WHERE id = $1
              AND (NOT $8 OR user_id IS NULL)
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|s| s.japanese()))
        .bind(patch.location.as_deref())
        .bind(patch.user_id)
        .bind(patch.updated_by)
        .bind(patch.touch_last_updated)
        .bind(patch.at)
        .bind(patch.require_unassigned)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
