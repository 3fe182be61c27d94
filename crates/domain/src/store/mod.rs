//! Persistence seam for the audit workflow.
//!
//! Services only talk to storage through [`AuditStore`]. Every method that
//! writes more than one row is a single unit of work in the implementation.

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    Asset, AssetPatch, AssetStatus, AuditAsset, AuditAssignment, AuditLogEntry, AuditPlan, AuditPlanStatus,
    CorrectiveAction, CorrectiveActionAssignment, Employee, Location, NewAuditAsset,
    NewAuditAssignment, NewAuditLogEntry, NewAuditPlan, NewCorrectiveAction,
    NewCorrectiveActionAssignment,
};

pub use memory::InMemoryAuditStore;

/// Storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    /// A stored value could not be mapped onto a domain type.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A row the unit of work depends on vanished mid-flight.
    #[error("Row not found: {0}")]
    RowNotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Rows written atomically when an audit plan is created.
#[derive(Debug, Clone)]
pub struct AuditPlanFanOut {
    pub plan: NewAuditPlan,
    pub assignments: Vec<NewAuditAssignment>,
    pub snapshots: Vec<NewAuditAsset>,
    /// Audit log entry for the plan; the store sets `resource_id` to the new
    /// plan id.
    pub log: NewAuditLogEntry,
}

/// What the fan-out produced.
#[derive(Debug, Clone)]
pub struct CreatedAuditPlan {
    pub plan: AuditPlan,
    pub assignments: Vec<AuditAssignment>,
    pub audit_assets: Vec<AuditAsset>,
}

/// A status submission: the updated audit asset plus the immediate write to
/// the canonical asset.
#[derive(Debug, Clone)]
pub struct AuditSubmission {
    pub audit_asset: AuditAsset,
    pub asset_patch: AssetPatch,
}

/// Result of the guarded submission write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Recorded,
    /// The audit asset was resolved before the write landed. Nothing written.
    AlreadyResolved,
    /// A reassignment found the canonical asset already assigned. Nothing
    /// written.
    AlreadyAssigned,
}

/// Result of the resolution writeback.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionWrite {
    /// The asset was patched and the audit asset marked resolved.
    Applied { previous_status: AssetStatus, asset: Asset },
    /// The audit asset was already resolved and the patch had nothing left
    /// to change. Nothing written.
    Unchanged(Asset),
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Cheap connectivity check.
    async fn ping(&self) -> StoreResult<()>;

    async fn find_employee(&self, id: i64) -> StoreResult<Option<Employee>>;

    async fn find_employees(&self, ids: &[i64]) -> StoreResult<Vec<Employee>>;

    /// Exact name match.
    async fn find_employee_by_name(&self, name: &str) -> StoreResult<Option<Employee>>;

    async fn find_locations(&self, ids: &[i64]) -> StoreResult<Vec<Location>>;

    async fn find_asset(&self, id: i64) -> StoreResult<Option<Asset>>;

    async fn find_assets(&self, ids: &[i64]) -> StoreResult<Vec<Asset>>;

    /// Assets whose `location` equals one of `names`, ordered by id.
    async fn assets_in_locations(&self, names: &[String]) -> StoreResult<Vec<Asset>>;

    /// Inserts the plan (status Planning), its assignments, its audit asset
    /// snapshots and its audit log entry in one transaction.
    async fn create_audit_plan(&self, fan_out: AuditPlanFanOut) -> StoreResult<CreatedAuditPlan>;

    async fn find_audit_plan(&self, id: i64) -> StoreResult<Option<AuditPlan>>;

    /// Plans that are not Completed.
    async fn active_audit_plans(&self) -> StoreResult<Vec<AuditPlan>>;

    /// Sets the plan status. When `from` is given the write only happens if
    /// the stored status equals it. Returns whether a row changed.
    async fn update_audit_plan_status(
        &self,
        id: i64,
        from: Option<AuditPlanStatus>,
        to: AuditPlanStatus,
    ) -> StoreResult<bool>;

    async fn assignments_for_plan(&self, audit_plan_id: i64) -> StoreResult<Vec<AuditAssignment>>;

    async fn find_audit_asset(&self, id: i64) -> StoreResult<Option<AuditAsset>>;

    async fn audit_assets_for_plan(&self, audit_plan_id: i64) -> StoreResult<Vec<AuditAsset>>;

    /// Writes a submission in one transaction. The audit asset row is only
    /// updated while `resolved = false`; a reassigning patch only applies
    /// while the canonical asset has no user.
    async fn record_audit_submission(
        &self,
        submission: &AuditSubmission,
    ) -> StoreResult<SubmissionOutcome>;

    /// Applies `patch` to the canonical asset, then marks the audit asset
    /// resolved. Both rows are locked for the check and the write, and both
    /// land together or not at all. Note lines merge into the notes log as
    /// stored at write time.
    async fn write_resolution(
        &self,
        audit_asset_id: i64,
        asset_id: i64,
        patch: &AssetPatch,
    ) -> StoreResult<ResolutionWrite>;

    /// Inserts an action and, optionally, its assignment binding.
    async fn insert_corrective_action(
        &self,
        action: NewCorrectiveAction,
        assignment: Option<NewCorrectiveActionAssignment>,
    ) -> StoreResult<(CorrectiveAction, Option<CorrectiveActionAssignment>)>;

    async fn find_corrective_action(&self, id: i64) -> StoreResult<Option<CorrectiveAction>>;

    async fn find_corrective_actions(&self, ids: &[i64]) -> StoreResult<Vec<CorrectiveAction>>;

    async fn corrective_actions_for_plan(
        &self,
        audit_plan_id: i64,
    ) -> StoreResult<Vec<CorrectiveAction>>;

    /// `due_date < today` and not completed.
    async fn overdue_corrective_actions(&self, today: NaiveDate)
        -> StoreResult<Vec<CorrectiveAction>>;

    /// Pending or in progress with `due_date >= today`.
    async fn upcoming_corrective_actions(
        &self,
        today: NaiveDate,
    ) -> StoreResult<Vec<CorrectiveAction>>;

    /// Number of actions on the audit asset whose status is not completed.
    async fn count_incomplete_corrective_actions(&self, audit_asset_id: i64) -> StoreResult<i64>;

    async fn find_action_assignment(
        &self,
        corrective_action_id: i64,
    ) -> StoreResult<Option<CorrectiveActionAssignment>>;

    /// Persists the action and, when given, its mirrored assignment in one
    /// transaction.
    async fn update_corrective_action(
        &self,
        action: &CorrectiveAction,
        assignment: Option<&CorrectiveActionAssignment>,
    ) -> StoreResult<()>;

    async fn append_audit_log(&self, entry: NewAuditLogEntry) -> StoreResult<AuditLogEntry>;
}
