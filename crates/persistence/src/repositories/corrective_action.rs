//! Corrective action repository.

use chrono::NaiveDate;
use domain::models::{
    ActionStatus, CorrectiveAction, CorrectiveActionAssignment, NewCorrectiveAction,
    NewCorrectiveActionAssignment,
};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::entities::{CorrectiveActionAssignmentEntity, CorrectiveActionEntity};
use crate::metrics::QueryTimer;

const ACTION_COLUMNS: &str = "id, audit_asset_id, audit_plan_id, issue, action, assigned_to, \
     priority, status, due_date, completed_date, notes, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "id, corrective_action_id, audit_assignment_id, auditor_id, \
     status, started_at, completed_at, progress_notes, created_at, updated_at";

/// Repository for corrective actions and their assignment bindings.
#[derive(Clone)]
pub struct CorrectiveActionRepository {
    pool: PgPool,
}

impl CorrectiveActionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an action and its optional assignment together.
    pub async fn insert(
        &self,
        action: &NewCorrectiveAction,
        assignment: Option<&NewCorrectiveActionAssignment>,
    ) -> Result<(CorrectiveActionEntity, Option<CorrectiveActionAssignmentEntity>), sqlx::Error> {
        let timer = QueryTimer::new("insert_corrective_action");
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, CorrectiveActionEntity>(&format!(
            r#"
            INSERT INTO corrective_actions (
                audit_asset_id, audit_plan_id, issue, action, assigned_to, priority, status,
                due_date, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {}
            "#,
            ACTION_COLUMNS
        ))
        .bind(action.audit_asset_id)
        .bind(action.audit_plan_id)
        .bind(&action.issue)
        .bind(&action.action)
        .bind(action.assigned_to)
        .bind(action.priority.as_str())
        .bind(ActionStatus::Pending.as_str())
        .bind(action.due_date)
        .bind(Json(&action.notes))
        .bind(action.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let binding = match assignment {
            Some(new) => Some(
                sqlx::query_as::<_, CorrectiveActionAssignmentEntity>(&format!(
                    r#"
                    INSERT INTO corrective_action_assignments (
                        corrective_action_id, audit_assignment_id, auditor_id, status,
                        created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $5)
                    RETURNING {}
                    "#,
                    ASSIGNMENT_COLUMNS
                ))
                .bind(created.id)
                .bind(new.audit_assignment_id)
                .bind(new.auditor_id)
                .bind(ActionStatus::Pending.as_str())
                .bind(new.created_at)
                .fetch_one(&mut *tx)
                .await?,
            ),
            None => None,
        };

        tx.commit().await?;
        timer.record();
        Ok((created, binding))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<CorrectiveActionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_corrective_action_by_id");
        let result = sqlx::query_as::<_, CorrectiveActionEntity>(&format!(
            "SELECT {} FROM corrective_actions WHERE id = $1",
            ACTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<CorrectiveActionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_corrective_actions_by_ids");
        let result = sqlx::query_as::<_, CorrectiveActionEntity>(&format!(
            "SELECT {} FROM corrective_actions WHERE id = ANY($1) ORDER BY id",
            ACTION_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    pub async fn find_for_plan(
        &self,
        audit_plan_id: i64,
    ) -> Result<Vec<CorrectiveActionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_corrective_actions_for_plan");
        let result = sqlx::query_as::<_, CorrectiveActionEntity>(&format!(
            "SELECT {} FROM corrective_actions WHERE audit_plan_id = $1 ORDER BY id",
            ACTION_COLUMNS
        ))
        .bind(audit_plan_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Past due and not completed.
    pub async fn find_overdue(&self, today: NaiveDate) -> Result<Vec<CorrectiveActionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_overdue_corrective_actions");
        let result = sqlx::query_as::<_, CorrectiveActionEntity>(&format!(
            r#"
            SELECT {}
            FROM corrective_actions
            WHERE due_date < $1 AND status <> 'completed'
            ORDER BY due_date, id
            "#,
            ACTION_COLUMNS
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Pending or in progress and not yet due.
    pub async fn find_upcoming(&self, today: NaiveDate) -> Result<Vec<CorrectiveActionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_upcoming_corrective_actions");
        let result = sqlx::query_as::<_, CorrectiveActionEntity>(&format!(
            r#"
            SELECT {}
            FROM corrective_actions
            WHERE due_date >= $1 AND status IN ('pending', 'in_progress')
            ORDER BY due_date, id
            "#,
            ACTION_COLUMNS
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    pub async fn count_incomplete(&self, audit_asset_id: i64) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_incomplete_corrective_actions");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM corrective_actions
            WHERE audit_asset_id = $1 AND status <> 'completed'
            "#,
        )
        .bind(audit_asset_id)
        .fetch_one(&self.pool)
        .await;
        timer.finish(result)
    }

    pub async fn find_assignment(
        &self,
        corrective_action_id: i64,
    ) -> Result<Option<CorrectiveActionAssignmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_corrective_action_assignment");
        let result = sqlx::query_as::<_, CorrectiveActionAssignmentEntity>(&format!(
            "SELECT {} FROM corrective_action_assignments WHERE corrective_action_id = $1",
            ASSIGNMENT_COLUMNS
        ))
        .bind(corrective_action_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Persists the action and its mirrored assignment together.
    pub async fn update(
        &self,
        action: &CorrectiveAction,
        assignment: Option<&CorrectiveActionAssignment>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("update_corrective_action");
        let mut tx = self.pool.begin().await?;

        Self::update_action(&mut tx, action).await?;
        if let Some(assignment) = assignment {
            Self::update_assignment(&mut tx, assignment).await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(())
    }

    async fn update_action(conn: &mut PgConnection, action: &CorrectiveAction) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE corrective_actions
            SET issue = $2,
                action = $3,
                assigned_to = $4,
                priority = $5,
                status = $6,
                due_date = $7,
                completed_date = $8,
                notes = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(action.id)
        .bind(&action.issue)
        .bind(&action.action)
        .bind(action.assigned_to)
        .bind(action.priority.as_str())
        .bind(action.status.as_str())
        .bind(action.due_date)
        .bind(action.completed_date)
        .bind(Json(&action.notes))
        .bind(action.updated_at)
        .execute(conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    async fn update_assignment(
        conn: &mut PgConnection,
        assignment: &CorrectiveActionAssignment,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE corrective_action_assignments
            SET status = $2,
                started_at = $3,
                completed_at = $4,
                progress_notes = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.status.as_str())
        .bind(assignment.started_at)
        .bind(assignment.completed_at)
        .bind(Json(&assignment.progress_notes))
        .bind(assignment.updated_at)
        .execute(conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }
}
