//! Immutable audit log entries for the audit workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Who performed an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// An employee or auditor, identified by employee id.
    Employee,
    /// A scheduled job or cascade with no human actor.
    System,
}

impl FromStr for ActorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "employee" => Ok(ActorType::Employee),
            "system" => Ok(ActorType::System),
            _ => Err(format!("Unknown actor type: {}", s)),
        }
    }
}

impl std::fmt::Display for ActorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorType::Employee => write!(f, "employee"),
            ActorType::System => write!(f, "system"),
        }
    }
}

/// Audited actions following the format: resource.operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AuditPlanCreate,
    AuditPlanComplete,
    AuditAssetSubmit,
    AuditAssetResolve,
    CorrectiveActionCreate,
    CorrectiveActionStatusChange,
    AccessTokenIssue,
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audit_plan.create" => Ok(AuditAction::AuditPlanCreate),
            "audit_plan.complete" => Ok(AuditAction::AuditPlanComplete),
            "audit_asset.submit" => Ok(AuditAction::AuditAssetSubmit),
            "audit_asset.resolve" => Ok(AuditAction::AuditAssetResolve),
            "corrective_action.create" => Ok(AuditAction::CorrectiveActionCreate),
            "corrective_action.status_change" => Ok(AuditAction::CorrectiveActionStatusChange),
            "access_token.issue" => Ok(AuditAction::AccessTokenIssue),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::AuditPlanCreate => "audit_plan.create",
            AuditAction::AuditPlanComplete => "audit_plan.complete",
            AuditAction::AuditAssetSubmit => "audit_asset.submit",
            AuditAction::AuditAssetResolve => "audit_asset.resolve",
            AuditAction::CorrectiveActionCreate => "corrective_action.create",
            AuditAction::CorrectiveActionStatusChange => "corrective_action.status_change",
            AuditAction::AccessTokenIssue => "access_token.issue",
        };
        write!(f, "{}", s)
    }
}

/// Represents a change to a field with old and new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Option<JsonValue>,
    pub new: Option<JsonValue>,
}

impl FieldChange {
    pub fn new(old: Option<JsonValue>, new: Option<JsonValue>) -> Self {
        Self { old, new }
    }
}

/// A stored audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i64,
    pub action: AuditAction,
    pub actor_type: ActorType,
    pub actor_id: Option<i64>,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub summary: String,
    pub changes: Option<BTreeMap<String, FieldChange>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new audit log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditLogEntry {
    pub action: AuditAction,
    pub actor_type: ActorType,
    pub actor_id: Option<i64>,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub summary: String,
    pub changes: Option<BTreeMap<String, FieldChange>>,
    pub created_at: DateTime<Utc>,
}

impl NewAuditLogEntry {
    /// Attach the row id assigned by the store.
    pub fn into_entry(self, id: i64) -> AuditLogEntry {
        AuditLogEntry {
            id,
            action: self.action,
            actor_type: self.actor_type,
            actor_id: self.actor_id,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            summary: self.summary,
            changes: self.changes,
            created_at: self.created_at,
        }
    }
}
