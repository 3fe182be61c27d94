//! Audit plan domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use super::corrective_action::CorrectiveActionCounts;

/// Lifecycle of an audit plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditPlanStatus {
    #[serde(rename = "Planning")]
    Planning,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl AuditPlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditPlanStatus::Planning => "Planning",
            AuditPlanStatus::InProgress => "In Progress",
            AuditPlanStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for AuditPlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditPlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Planning" => Ok(AuditPlanStatus::Planning),
            "In Progress" => Ok(AuditPlanStatus::InProgress),
            "Completed" => Ok(AuditPlanStatus::Completed),
            _ => Err(format!("Unknown audit plan status: {}", s)),
        }
    }
}

/// A time-boxed audit campaign over a set of locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPlan {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: AuditPlanStatus,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl AuditPlan {
    /// Whole days from `today` until the due date (negative once overdue).
    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.due_date - today).num_days()
    }

    pub fn is_active(&self) -> bool {
        self.status != AuditPlanStatus::Completed
    }
}

/// Plan row to be inserted by the fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditPlan {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating an audit plan.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditPlanRequest {
    #[validate(length(max = 255, message = "Audit plan name must be at most 255 characters"))]
    pub name: String,

    pub start_date: NaiveDate,

    pub due_date: NaiveDate,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "At least one location must be selected"))]
    pub location_ids: Vec<i64>,

    #[serde(default)]
    #[validate(length(min = 1, message = "At least one auditor must be selected"))]
    pub auditor_ids: Vec<i64>,
}

/// Response after creating an audit plan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPlanCreatedResponse {
    pub plan: AuditPlan,
    pub assignment_count: usize,
    pub audit_asset_count: usize,
    pub notifications_sent: usize,
}

/// Per-location progress inside a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStatistics {
    pub location: String,
    pub total: usize,
    pub audited: usize,
    pub resolved: usize,
}

/// Progress summary for an audit plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPlanStatistics {
    pub audit_plan_id: i64,
    pub status: AuditPlanStatus,
    pub total_assets: usize,
    pub audited_assets: usize,
    pub unaudited_assets: usize,
    pub resolved_assets: usize,
    pub discrepancies: usize,
    /// Audited share of all assets, 0.0 for an empty plan.
    pub completion_rate: f64,
    pub corrective_actions: CorrectiveActionCounts,
    pub locations: Vec<LocationStatistics>,
}
