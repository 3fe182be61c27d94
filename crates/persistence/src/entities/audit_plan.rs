//! Audit plan and audit assignment entities.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{AuditAssignment, AuditPlan};
use domain::store::StoreError;
use sqlx::FromRow;

use super::decode;

/// Database row mapping for the audit_plans table.
#[derive(Debug, Clone, FromRow)]
pub struct AuditPlanEntity {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuditPlanEntity> for AuditPlan {
    type Error = StoreError;

    fn try_from(entity: AuditPlanEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            start_date: entity.start_date,
            due_date: entity.due_date,
            status: decode("audit_plans.status", &entity.status)?,
            created_by: entity.created_by,
            created_at: entity.created_at,
        })
    }
}

/// Database row mapping for the audit_assignments table.
#[derive(Debug, Clone, FromRow)]
pub struct AuditAssignmentEntity {
    pub id: i64,
    pub audit_plan_id: i64,
    pub location_id: i64,
    pub auditor_id: i64,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuditAssignmentEntity> for AuditAssignment {
    type Error = StoreError;

    fn try_from(entity: AuditAssignmentEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            audit_plan_id: entity.audit_plan_id,
            location_id: entity.location_id,
            auditor_id: entity.auditor_id,
            status: decode("audit_assignments.status", &entity.status)?,
            notes: entity.notes,
            created_at: entity.created_at,
        })
    }
}
