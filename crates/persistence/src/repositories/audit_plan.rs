//! Audit plan repository: plans, assignments and the creation fan-out.

use domain::models::AuditPlanStatus;
use domain::store::AuditPlanFanOut;
use sqlx::PgPool;

use super::audit_log::AuditLogRepository;
use crate::entities::{AuditAssetEntity, AuditAssignmentEntity, AuditPlanEntity};
use crate::metrics::QueryTimer;

const PLAN_COLUMNS: &str =
    "id, name, description, start_date, due_date, status, created_by, created_at";

pub(crate) const AUDIT_ASSET_COLUMNS: &str = "id, audit_plan_id, asset_id, original_location, \
     original_user, original_status, current_status, current_location, current_user_name, \
     auditor_notes, audited_at, audited_by, audit_status, resolved, created_at, updated_at";

/// Rows produced by [`AuditPlanRepository::create_with_fan_out`].
#[derive(Debug)]
pub struct FanOutRows {
    pub plan: AuditPlanEntity,
    pub assignments: Vec<AuditAssignmentEntity>,
    pub audit_assets: Vec<AuditAssetEntity>,
}

/// Repository for audit plans and their assignments.
#[derive(Clone)]
pub struct AuditPlanRepository {
    pool: PgPool,
}

impl AuditPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the plan, one assignment per (location, auditor) pair, one
    /// audit asset per snapshot and the audit log entry in a single
    /// transaction.
    pub async fn create_with_fan_out(&self, fan_out: &AuditPlanFanOut) -> Result<FanOutRows, sqlx::Error> {
        let timer = QueryTimer::new("create_audit_plan_fan_out");
        let mut tx = self.pool.begin().await?;

        let plan = sqlx::query_as::<_, AuditPlanEntity>(&format!(
            r#"
            INSERT INTO audit_plans (name, description, start_date, due_date, status, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PLAN_COLUMNS
        ))
        .bind(&fan_out.plan.name)
        .bind(fan_out.plan.description.as_deref())
        .bind(fan_out.plan.start_date)
        .bind(fan_out.plan.due_date)
        .bind(AuditPlanStatus::Planning.as_str())
        .bind(fan_out.plan.created_by)
        .bind(fan_out.plan.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let mut assignments = Vec::with_capacity(fan_out.assignments.len());
        for pair in &fan_out.assignments {
            let assignment = sqlx::query_as::<_, AuditAssignmentEntity>(
                r#"
                INSERT INTO audit_assignments (audit_plan_id, location_id, auditor_id, status, created_at)
                VALUES ($1, $2, $3, 'Assigned', $4)
                RETURNING id, audit_plan_id, location_id, auditor_id, status, notes, created_at
                "#,
            )
            .bind(plan.id)
            .bind(pair.location_id)
            .bind(pair.auditor_id)
            .bind(plan.created_at)
            .fetch_one(&mut *tx)
            .await?;
            assignments.push(assignment);
        }

        let mut audit_assets = Vec::with_capacity(fan_out.snapshots.len());
        for snapshot in &fan_out.snapshots {
            let status = snapshot.status.japanese();
            let audit_asset = sqlx::query_as::<_, AuditAssetEntity>(&format!(
                r#"
                INSERT INTO audit_assets (
                    audit_plan_id, asset_id, original_location, original_user, original_status,
                    current_status, current_location, current_user_name, audit_status, resolved,
                    created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $5, $3, $4, FALSE, FALSE, $6, $6)
                RETURNING {}
                "#,
                AUDIT_ASSET_COLUMNS
            ))
            .bind(plan.id)
            .bind(snapshot.asset_id)
            .bind(&snapshot.location)
            .bind(snapshot.user.as_deref())
            .bind(status)
            .bind(plan.created_at)
            .fetch_one(&mut *tx)
            .await?;
            audit_assets.push(audit_asset);
        }

        let mut log = fan_out.log.clone();
        log.resource_id = Some(plan.id.to_string());
        AuditLogRepository::insert_in(&mut tx, &log).await?;

        tx.commit().await?;
        timer.record();
        Ok(FanOutRows {
            plan,
            assignments,
            audit_assets,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<AuditPlanEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_audit_plan_by_id");
        let result = sqlx::query_as::<_, AuditPlanEntity>(&format!(
            "SELECT {} FROM audit_plans WHERE id = $1",
            PLAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Plans that are not completed, oldest due date first.
    pub async fn find_active(&self) -> Result<Vec<AuditPlanEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_audit_plans");
        let result = sqlx::query_as::<_, AuditPlanEntity>(&format!(
            "SELECT {} FROM audit_plans WHERE status <> 'Completed' ORDER BY due_date, id",
            PLAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Compare-and-set on the plan status when `from` is given.
    pub async fn update_status(
        &self,
        id: i64,
        from: Option<AuditPlanStatus>,
        to: AuditPlanStatus,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("update_audit_plan_status");
        let result = sqlx::query(
            r#"
            UPDATE audit_plans
            SET status = $2
            WHERE id = $1
              AND status <> $2
              AND ($3::text IS NULL OR status = $3)
            "#,
        )
        .bind(id)
        .bind(to.as_str())
        .bind(from.map(|s| s.as_str()))
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn assignments_for_plan(
        &self,
        audit_plan_id: i64,
    ) -> Result<Vec<AuditAssignmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_audit_assignments_for_plan");
        let result = sqlx::query_as::<_, AuditAssignmentEntity>(
            r#"
            SELECT id, audit_plan_id, location_id, auditor_id, status, notes, created_at
            FROM audit_assignments
            WHERE audit_plan_id = $1
            ORDER BY id
            "#,
        )
        .bind(audit_plan_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }
}
