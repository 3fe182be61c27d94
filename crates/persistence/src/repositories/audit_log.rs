//! Audit log repository for database operations.

use domain::models::NewAuditLogEntry;
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};

use crate::entities::AuditLogEntity;
use crate::metrics::QueryTimer;

/// Repository for audit log database operations. Entries are never updated
/// or deleted.
#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new audit log entry.
    pub async fn insert(&self, entry: &NewAuditLogEntry) -> Result<AuditLogEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_audit_log");
        let mut conn = self.pool.acquire().await?;
        let result = Self::insert_in(&mut conn, entry).await;
        timer.finish(result)
    }

    /// Insert inside the caller's transaction.
    pub(crate) async fn insert_in(
        conn: &mut PgConnection,
        entry: &NewAuditLogEntry,
    ) -> Result<AuditLogEntity, sqlx::Error> {
        let changes_json = entry
            .changes
            .as_ref()
            .map(|changes| serde_json::to_value(changes).unwrap_or(JsonValue::Null));

        sqlx::query_as::<_, AuditLogEntity>(
            r#"
            INSERT INTO audit_logs (
                action, actor_type, actor_id, resource_type, resource_id, summary, changes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, action, actor_type, actor_id, resource_type, resource_id, summary,
                      changes, created_at
            "#,
        )
        .bind(entry.action.to_string())
        .bind(entry.actor_type.to_string())
        .bind(entry.actor_id)
        .bind(&entry.resource_type)
        .bind(entry.resource_id.as_deref())
        .bind(&entry.summary)
        .bind(changes_json)
        .bind(entry.created_at)
        .fetch_one(conn)
        .await
    }
}
