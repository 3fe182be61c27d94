//! Corrective action entities.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{CorrectiveAction, CorrectiveActionAssignment, NotesLog};
use domain::store::StoreError;
use sqlx::types::Json;
use sqlx::FromRow;

use super::decode;

/// Database row mapping for the corrective_actions table.
#[derive(Debug, Clone, FromRow)]
pub struct CorrectiveActionEntity {
    pub id: i64,
    pub audit_asset_id: i64,
    pub audit_plan_id: i64,
    pub issue: String,
    pub action: String,
    pub assigned_to: Option<i64>,
    pub priority: String,
    pub status: String,
    pub due_date: NaiveDate,
    pub completed_date: Option<DateTime<Utc>>,
    pub notes: Json<NotesLog>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CorrectiveActionEntity> for CorrectiveAction {
    type Error = StoreError;

    fn try_from(entity: CorrectiveActionEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            audit_asset_id: entity.audit_asset_id,
            audit_plan_id: entity.audit_plan_id,
            issue: entity.issue,
            action: entity.action,
            assigned_to: entity.assigned_to,
            priority: decode("corrective_actions.priority", &entity.priority)?,
            status: decode("corrective_actions.status", &entity.status)?,
            due_date: entity.due_date,
            completed_date: entity.completed_date,
            notes: entity.notes.0,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

/// Database row mapping for the corrective_action_assignments table.
#[derive(Debug, Clone, FromRow)]
pub struct CorrectiveActionAssignmentEntity {
    pub id: i64,
    pub corrective_action_id: i64,
    pub audit_assignment_id: i64,
    pub auditor_id: i64,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_notes: Json<NotesLog>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CorrectiveActionAssignmentEntity> for CorrectiveActionAssignment {
    type Error = StoreError;

    fn try_from(entity: CorrectiveActionAssignmentEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            corrective_action_id: entity.corrective_action_id,
            audit_assignment_id: entity.audit_assignment_id,
            auditor_id: entity.auditor_id,
            status: decode("corrective_action_assignments.status", &entity.status)?,
            started_at: entity.started_at,
            completed_at: entity.completed_at,
            progress_notes: entity.progress_notes.0,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}
