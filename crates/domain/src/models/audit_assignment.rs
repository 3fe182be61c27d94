//! Audit assignment: one auditor responsible for one location in a plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStatus {
    #[serde(rename = "Assigned")]
    Assigned,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "Assigned",
            AssignmentStatus::InProgress => "In Progress",
            AssignmentStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Assigned" => Ok(AssignmentStatus::Assigned),
            "In Progress" => Ok(AssignmentStatus::InProgress),
            "Completed" => Ok(AssignmentStatus::Completed),
            _ => Err(format!("Unknown assignment status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditAssignment {
    pub id: i64,
    pub audit_plan_id: i64,
    pub location_id: i64,
    pub auditor_id: i64,
    pub status: AssignmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One (location, auditor) pair of the plan's cross product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NewAuditAssignment {
    pub location_id: i64,
    pub auditor_id: i64,
}

/// Builds the full location × auditor cross product, ignoring duplicate ids.
pub fn cross_product(location_ids: &[i64], auditor_ids: &[i64]) -> Vec<NewAuditAssignment> {
    let mut locations: Vec<i64> = Vec::with_capacity(location_ids.len());
    for id in location_ids {
        if !locations.contains(id) {
            locations.push(*id);
        }
    }
    let mut auditors: Vec<i64> = Vec::with_capacity(auditor_ids.len());
    for id in auditor_ids {
        if !auditors.contains(id) {
            auditors.push(*id);
        }
    }

    locations
        .iter()
        .flat_map(|location_id| {
            auditors.iter().map(move |auditor_id| NewAuditAssignment {
                location_id: *location_id,
                auditor_id: *auditor_id,
            })
        })
        .collect()
}
