//! PostgreSQL implementation of the audit store.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::error;

use domain::models::{
    Asset, AssetPatch, AuditAsset, AuditAssignment, AuditLogEntry, AuditPlan, AuditPlanStatus,
    CorrectiveAction, CorrectiveActionAssignment, Employee, Location, NewAuditLogEntry,
    NewCorrectiveAction, NewCorrectiveActionAssignment,
};
use domain::store::{
    AuditPlanFanOut, AuditStore, AuditSubmission, CreatedAuditPlan, ResolutionWrite, StoreError,
    StoreResult, SubmissionOutcome,
};

use crate::repositories::{
    AssetRepository, AuditAssetRepository, AuditLogRepository, AuditPlanRepository,
    CorrectiveActionRepository, EmployeeRepository, LocationRepository,
};

/// Maps a driver error onto the store error the domain understands.
pub fn store_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::RowNotFound("expected row is missing".to_string()),
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::Decode(format!("column {}: {}", index, source))
        }
        sqlx::Error::Decode(source) => StoreError::Decode(source.to_string()),
        other => {
            error!(error = %other, "Database error");
            StoreError::Database(other.to_string())
        }
    }
}

fn convert_all<E, T>(rows: Vec<E>) -> StoreResult<Vec<T>>
where
    T: TryFrom<E, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn convert_opt<E, T>(row: Option<E>) -> StoreResult<Option<T>>
where
    T: TryFrom<E, Error = StoreError>,
{
    row.map(T::try_from).transpose()
}

/// [`AuditStore`] backed by PostgreSQL through the repositories.
#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
    employees: EmployeeRepository,
    locations: LocationRepository,
    assets: AssetRepository,
    plans: AuditPlanRepository,
    audit_assets: AuditAssetRepository,
    actions: CorrectiveActionRepository,
    audit_log: AuditLogRepository,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            employees: EmployeeRepository::new(pool.clone()),
            locations: LocationRepository::new(pool.clone()),
            assets: AssetRepository::new(pool.clone()),
            plans: AuditPlanRepository::new(pool.clone()),
            audit_assets: AuditAssetRepository::new(pool.clone()),
            actions: CorrectiveActionRepository::new(pool.clone()),
            audit_log: AuditLogRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn find_employee(&self, id: i64) -> StoreResult<Option<Employee>> {
        let row = self.employees.find_by_id(id).await.map_err(store_err)?;
        Ok(row.map(Employee::from))
    }

    async fn find_employees(&self, ids: &[i64]) -> StoreResult<Vec<Employee>> {
        let rows = self.employees.find_by_ids(ids).await.map_err(store_err)?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn find_employee_by_name(&self, name: &str) -> StoreResult<Option<Employee>> {
        let row = self.employees.find_by_name(name).await.map_err(store_err)?;
        Ok(row.map(Employee::from))
    }

    async fn find_locations(&self, ids: &[i64]) -> StoreResult<Vec<Location>> {
        let rows = self.locations.find_by_ids(ids).await.map_err(store_err)?;
        Ok(rows.into_iter().map(Location::from).collect())
    }

    async fn find_asset(&self, id: i64) -> StoreResult<Option<Asset>> {
        convert_opt(self.assets.find_by_id(id).await.map_err(store_err)?)
    }

    async fn find_assets(&self, ids: &[i64]) -> StoreResult<Vec<Asset>> {
        convert_all(self.assets.find_by_ids(ids).await.map_err(store_err)?)
    }

    async fn assets_in_locations(&self, names: &[String]) -> StoreResult<Vec<Asset>> {
        convert_all(self.assets.find_in_locations(names).await.map_err(store_err)?)
    }

    async fn create_audit_plan(&self, fan_out: AuditPlanFanOut) -> StoreResult<CreatedAuditPlan> {
        let rows = self
            .plans
            .create_with_fan_out(&fan_out)
            .await
            .map_err(store_err)?;
        Ok(CreatedAuditPlan {
            plan: AuditPlan::try_from(rows.plan)?,
            assignments: convert_all(rows.assignments)?,
            audit_assets: convert_all(rows.audit_assets)?,
        })
    }

    async fn find_audit_plan(&self, id: i64) -> StoreResult<Option<AuditPlan>> {
        convert_opt(self.plans.find_by_id(id).await.map_err(store_err)?)
    }

    async fn active_audit_plans(&self) -> StoreResult<Vec<AuditPlan>> {
        convert_all(self.plans.find_active().await.map_err(store_err)?)
    }

    async fn update_audit_plan_status(
        &self,
        id: i64,
        from: Option<AuditPlanStatus>,
        to: AuditPlanStatus,
    ) -> StoreResult<bool> {
        self.plans.update_status(id, from, to).await.map_err(store_err)
    }

    async fn assignments_for_plan(&self, audit_plan_id: i64) -> StoreResult<Vec<AuditAssignment>> {
        convert_all(
            self.plans
                .assignments_for_plan(audit_plan_id)
                .await
                .map_err(store_err)?,
        )
    }

    async fn find_audit_asset(&self, id: i64) -> StoreResult<Option<AuditAsset>> {
        convert_opt(self.audit_assets.find_by_id(id).await.map_err(store_err)?)
    }

    async fn audit_assets_for_plan(&self, audit_plan_id: i64) -> StoreResult<Vec<AuditAsset>> {
        convert_all(
            self.audit_assets
                .find_for_plan(audit_plan_id)
                .await
                .map_err(store_err)?,
        )
    }

    async fn record_audit_submission(
        &self,
        submission: &AuditSubmission,
    ) -> StoreResult<SubmissionOutcome> {
        self.audit_assets
            .record_submission(submission)
            .await
            .map_err(store_err)
    }

    async fn write_resolution(
        &self,
        audit_asset_id: i64,
        asset_id: i64,
        patch: &AssetPatch,
    ) -> StoreResult<ResolutionWrite> {
        self.audit_assets
            .write_resolution(audit_asset_id, asset_id, patch)
            .await
            .map_err(store_err)
    }

    async fn insert_corrective_action(
        &self,
        action: NewCorrectiveAction,
        assignment: Option<NewCorrectiveActionAssignment>,
    ) -> StoreResult<(CorrectiveAction, Option<CorrectiveActionAssignment>)> {
        let (action, assignment) = self
            .actions
            .insert(&action, assignment.as_ref())
            .await
            .map_err(store_err)?;
        Ok((
            CorrectiveAction::try_from(action)?,
            convert_opt(assignment)?,
        ))
    }

    async fn find_corrective_action(&self, id: i64) -> StoreResult<Option<CorrectiveAction>> {
        convert_opt(self.actions.find_by_id(id).await.map_err(store_err)?)
    }

    async fn find_corrective_actions(&self, ids: &[i64]) -> StoreResult<Vec<CorrectiveAction>> {
        convert_all(self.actions.find_by_ids(ids).await.map_err(store_err)?)
    }

    async fn corrective_actions_for_plan(
        &self,
        audit_plan_id: i64,
    ) -> StoreResult<Vec<CorrectiveAction>> {
        convert_all(
            self.actions
                .find_for_plan(audit_plan_id)
                .await
                .map_err(store_err)?,
        )
    }

    async fn overdue_corrective_actions(
        &self,
        today: NaiveDate,
    ) -> StoreResult<Vec<CorrectiveAction>> {
        convert_all(self.actions.find_overdue(today).await.map_err(store_err)?)
    }

    async fn upcoming_corrective_actions(
        &self,
        today: NaiveDate,
    ) -> StoreResult<Vec<CorrectiveAction>> {
        convert_all(self.actions.find_upcoming(today).await.map_err(store_err)?)
    }

    async fn count_incomplete_corrective_actions(&self, audit_asset_id: i64) -> StoreResult<i64> {
        self.actions
            .count_incomplete(audit_asset_id)
            .await
            .map_err(store_err)
    }

    async fn find_action_assignment(
        &self,
        corrective_action_id: i64,
    ) -> StoreResult<Option<CorrectiveActionAssignment>> {
        convert_opt(
            self.actions
                .find_assignment(corrective_action_id)
                .await
                .map_err(store_err)?,
        )
    }

    async fn update_corrective_action(
        &self,
        action: &CorrectiveAction,
        assignment: Option<&CorrectiveActionAssignment>,
    ) -> StoreResult<()> {
        self.actions
            .update(action, assignment)
            .await
            .map_err(store_err)
    }

    async fn append_audit_log(&self, entry: NewAuditLogEntry) -> StoreResult<AuditLogEntry> {
        let row = self.audit_log.insert(&entry).await.map_err(store_err)?;
        AuditLogEntry::try_from(row)
    }
}
