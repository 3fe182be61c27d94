//! Audit log entity.

use chrono::{DateTime, Utc};
use domain::models::{AuditLogEntry, FieldChange};
use domain::store::StoreError;
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::collections::BTreeMap;

use super::decode;

/// Database entity for audit logs.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogEntity {
    pub id: i64,
    /// Format: resource.operation.
    pub action: String,
    /// employee or system.
    pub actor_type: String,
    pub actor_id: Option<i64>,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub summary: String,
    /// Field name to `{old, new}`.
    pub changes: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuditLogEntity> for AuditLogEntry {
    type Error = StoreError;

    fn try_from(entity: AuditLogEntity) -> Result<Self, Self::Error> {
        let changes = entity
            .changes
            .map(serde_json::from_value::<BTreeMap<String, FieldChange>>)
            .transpose()
            .map_err(|e| StoreError::Decode(format!("audit_logs.changes: {}", e)))?;

        Ok(Self {
            id: entity.id,
            action: decode("audit_logs.action", &entity.action)?,
            actor_type: decode("audit_logs.actor_type", &entity.actor_type)?,
            actor_id: entity.actor_id,
            resource_type: entity.resource_type,
            resource_id: entity.resource_id,
            summary: entity.summary,
            changes,
            created_at: entity.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{ActorType, AuditAction};

    #[test]
    fn test_audit_log_entity_conversion() {
        let entity = AuditLogEntity {
            id: 7,
            action: "corrective_action.status_change".to_string(),
            actor_type: "system".to_string(),
            actor_id: None,
            resource_type: "corrective_action".to_string(),
            resource_id: Some("3".to_string()),
            summary: "Corrective action 3 moved from pending to overdue".to_string(),
            changes: Some(serde_json::json!({
                "status": { "old": "pending", "new": "overdue" }
            })),
            created_at: Utc::now(),
        };

        let entry = AuditLogEntry::try_from(entity).unwrap();
        assert_eq!(entry.action, AuditAction::CorrectiveActionStatusChange);
        assert_eq!(entry.actor_type, ActorType::System);
        let changes = entry.changes.unwrap();
        assert_eq!(changes["status"].new, Some(serde_json::json!("overdue")));
    }
}
