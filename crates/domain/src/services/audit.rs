//! Audit log entry construction.
//!
//! Services describe what happened through [`AuditLogBuilder`] and hand the
//! resulting [`NewAuditLogEntry`] to the store.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeMap;

use crate::models::{ActorType, AuditAction, FieldChange, NewAuditLogEntry};

/// Builder for creating audit log entries with a fluent API.
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
    actor_id: Option<i64>,
    actor_type: ActorType,
    action: AuditAction,
    resource_type: String,
    resource_id: Option<String>,
    summary: String,
    changes: Option<BTreeMap<String, FieldChange>>,
}

impl AuditLogBuilder {
    /// An action performed by an employee or auditor.
    pub fn employee_action(employee_id: i64, action: AuditAction) -> Self {
        Self {
            actor_id: Some(employee_id),
            actor_type: ActorType::Employee,
            action,
            resource_type: String::new(),
            resource_id: None,
            summary: String::new(),
            changes: None,
        }
    }

    /// An action performed by a job or cascade.
    pub fn system_action(action: AuditAction) -> Self {
        Self {
            actor_id: None,
            actor_type: ActorType::System,
            action,
            resource_type: String::new(),
            resource_id: None,
            summary: String::new(),
            changes: None,
        }
    }

    /// Employee action when an actor is known, system action otherwise.
    pub fn action_by(actor: Option<i64>, action: AuditAction) -> Self {
        match actor {
            Some(id) => Self::employee_action(id, action),
            None => Self::system_action(action),
        }
    }

    /// Set the resource being acted upon.
    pub fn on_resource(mut self, resource_type: impl Into<String>, resource_id: i64) -> Self {
        self.resource_type = resource_type.into();
        self.resource_id = Some(resource_id.to_string());
        self
    }

    /// Set just the resource type (when no ID is available yet).
    pub fn on_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Add a single field change with string values.
    pub fn with_change(
        mut self,
        field: impl Into<String>,
        old: Option<String>,
        new: Option<String>,
    ) -> Self {
        let changes = self.changes.get_or_insert_with(BTreeMap::new);
        changes.insert(
            field.into(),
            FieldChange::new(old.map(|v| json!(v)), new.map(|v| json!(v))),
        );
        self
    }

    /// Add a single field change with JSON values.
    pub fn with_json_change(
        mut self,
        field: impl Into<String>,
        old: Option<serde_json::Value>,
        new: Option<serde_json::Value>,
    ) -> Self {
        let changes = self.changes.get_or_insert_with(BTreeMap::new);
        changes.insert(field.into(), FieldChange::new(old, new));
        self
    }

    pub fn build(self, at: DateTime<Utc>) -> NewAuditLogEntry {
        NewAuditLogEntry {
            action: self.action,
            actor_type: self.actor_type,
            actor_id: self.actor_id,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            summary: self.summary,
            changes: self.changes,
            created_at: at,
        }
    }
}

/// Convenience functions for the workflow's audit log entries.
pub mod audit_helpers {
    use super::*;
    use crate::models::{ActionStatus, AssetStatus};

    /// Plan creation. The store fills in the plan id.
    pub fn plan_created(
        created_by: Option<i64>,
        plan_name: &str,
        location_count: usize,
        asset_count: usize,
        at: DateTime<Utc>,
    ) -> NewAuditLogEntry {
        AuditLogBuilder::action_by(created_by, AuditAction::AuditPlanCreate)
            .on_resource_type("audit_plan")
            .with_summary(format!(
                "Created audit plan '{}' covering {} location(s) and {} asset(s)",
                plan_name, location_count, asset_count
            ))
            .with_json_change("location_count", None, Some(json!(location_count)))
            .with_json_change("asset_count", None, Some(json!(asset_count)))
            .build(at)
    }

    pub fn plan_completed(actor: Option<i64>, plan_id: i64, at: DateTime<Utc>) -> NewAuditLogEntry {
        AuditLogBuilder::action_by(actor, AuditAction::AuditPlanComplete)
            .on_resource("audit_plan", plan_id)
            .with_summary(format!("Completed audit plan {}", plan_id))
            .build(at)
    }

    pub fn audit_asset_submitted(
        employee_id: i64,
        audit_asset_id: i64,
        old_status: AssetStatus,
        new_status: AssetStatus,
        at: DateTime<Utc>,
    ) -> NewAuditLogEntry {
        AuditLogBuilder::employee_action(employee_id, AuditAction::AuditAssetSubmit)
            .on_resource("audit_asset", audit_asset_id)
            .with_summary(format!("Submitted status {} for audit asset {}", new_status, audit_asset_id))
            .with_change(
                "current_status",
                Some(old_status.to_string()),
                Some(new_status.to_string()),
            )
            .build(at)
    }

    pub fn audit_asset_resolved(
        actor: Option<i64>,
        audit_asset_id: i64,
        asset_id: i64,
        old_status: AssetStatus,
        new_status: AssetStatus,
        at: DateTime<Utc>,
    ) -> NewAuditLogEntry {
        AuditLogBuilder::action_by(actor, AuditAction::AuditAssetResolve)
            .on_resource("audit_asset", audit_asset_id)
            .with_summary(format!(
                "Resolved audit asset {} onto asset {}",
                audit_asset_id, asset_id
            ))
            .with_change(
                "asset_status",
                Some(old_status.to_string()),
                Some(new_status.to_string()),
            )
            .build(at)
    }

    pub fn corrective_action_created(
        actor: Option<i64>,
        action_id: i64,
        audit_asset_id: i64,
        assigned_to: Option<i64>,
        at: DateTime<Utc>,
    ) -> NewAuditLogEntry {
        AuditLogBuilder::action_by(actor, AuditAction::CorrectiveActionCreate)
            .on_resource("corrective_action", action_id)
            .with_summary(format!(
                "Raised corrective action {} for audit asset {}",
                action_id, audit_asset_id
            ))
            .with_json_change("assigned_to", None, assigned_to.map(|id| json!(id)))
            .build(at)
    }

    pub fn corrective_action_status_changed(
        actor: Option<i64>,
        action_id: i64,
        old_status: ActionStatus,
        new_status: ActionStatus,
        at: DateTime<Utc>,
    ) -> NewAuditLogEntry {
        AuditLogBuilder::action_by(actor, AuditAction::CorrectiveActionStatusChange)
            .on_resource("corrective_action", action_id)
            .with_summary(format!(
                "Corrective action {} moved from {} to {}",
                action_id, old_status, new_status
            ))
            .with_change(
                "status",
                Some(old_status.to_string()),
                Some(new_status.to_string()),
            )
            .build(at)
    }
}
