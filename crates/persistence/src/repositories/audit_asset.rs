//! Audit asset repository: snapshots, guarded submissions and resolution
//! writebacks.

use domain::models::{Asset, AssetPatch};
use domain::store::{AuditSubmission, ResolutionWrite, SubmissionOutcome};
use sqlx::PgPool;

use super::asset::AssetRepository;
use super::audit_plan::AUDIT_ASSET_COLUMNS;
use crate::entities::AuditAssetEntity;
use crate::metrics::QueryTimer;

/// Repository for audit asset rows.
#[derive(Clone)]
pub struct AuditAssetRepository {
    pool: PgPool,
}

impl AuditAssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<AuditAssetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_audit_asset_by_id");
        let result = sqlx::query_as::<_, AuditAssetEntity>(&format!(
            "SELECT {} FROM audit_assets WHERE id = $1",
            AUDIT_ASSET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    pub async fn find_for_plan(&self, audit_plan_id: i64) -> Result<Vec<AuditAssetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_audit_assets_for_plan");
        let result = sqlx::query_as::<_, AuditAssetEntity>(&format!(
            "SELECT {} FROM audit_assets WHERE audit_plan_id = $1 ORDER BY id",
            AUDIT_ASSET_COLUMNS
        ))
        .bind(audit_plan_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Records a status submission.
    ///
    /// The audit asset and asset rows are locked first so the resolved check
    /// and the reassignment check see the state the write lands on.
    pub async fn record_submission(
        &self,
        submission: &AuditSubmission,
    ) -> Result<SubmissionOutcome, sqlx::Error> {
        let timer = QueryTimer::new("record_audit_submission");
        let audit_asset = &submission.audit_asset;
        let mut tx = self.pool.begin().await?;

        let resolved = sqlx::query_scalar::<_, bool>(
            "SELECT resolved FROM audit_assets WHERE id = $1 FOR UPDATE",
        )
        .bind(audit_asset.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
        if resolved {
            tx.rollback().await?;
            timer.record();
            return Ok(SubmissionOutcome::AlreadyResolved);
        }

        let current_user = AssetRepository::lock_user(&mut tx, audit_asset.asset_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        if submission.asset_patch.require_unassigned && current_user.is_some() {
            tx.rollback().await?;
            timer.record();
            return Ok(SubmissionOutcome::AlreadyAssigned);
        }
        AssetRepository::apply_patch(&mut tx, audit_asset.asset_id, &submission.asset_patch).await?;

        sqlx::query(
            r#"
            UPDATE audit_assets
            SET current_status = $2,
                current_location = $3,
                current_user_name = $4,
                auditor_notes = $5,
                audited_at = $6,
                audited_by = $7,
                audit_status = $8,
                updated_at = $9
            WHERE id = $1 AND resolved = FALSE
            "#,
        )
        .bind(audit_asset.id)
        .bind(audit_asset.current_status.japanese())
        .bind(&audit_asset.current_location)
        .bind(audit_asset.current_user.as_deref())
        .bind(audit_asset.auditor_notes.as_deref())
        .bind(audit_asset.audited_at)
        .bind(audit_asset.audited_by)
        .bind(audit_asset.audit_status)
        .bind(audit_asset.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(SubmissionOutcome::Recorded)
    }

    /// Writes the findings onto the canonical asset and marks the audit
    /// asset resolved in one transaction.
    ///
    /// Both rows are locked before anything is read, so the resolved check
    /// and the notes merge see the state the write lands on.
    pub async fn write_resolution(
        &self,
        audit_asset_id: i64,
        asset_id: i64,
        patch: &AssetPatch,
    ) -> Result<ResolutionWrite, sqlx::Error> {
        let timer = QueryTimer::new("write_audit_resolution");
        let mut tx = self.pool.begin().await?;

        let resolved = sqlx::query_scalar::<_, bool>(
            "SELECT resolved FROM audit_assets WHERE id = $1 FOR UPDATE",
        )
        .bind(audit_asset_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

        let entity = AssetRepository::lock_by_id(&mut tx, asset_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let mut asset = Asset::try_from(entity).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        if resolved && !patch.changes(&asset) {
            tx.rollback().await?;
            timer.record();
            return Ok(ResolutionWrite::Unchanged(asset));
        }

        let previous_status = asset.status;
        patch.apply_to(&mut asset);
        AssetRepository::store_locked(&mut tx, &asset).await?;

        sqlx::query("UPDATE audit_assets SET resolved = TRUE, updated_at = $2 WHERE id = $1")
            .bind(audit_asset_id)
            .bind(patch.at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(ResolutionWrite::Applied { previous_status, asset })
    }
}
