//! Corrective action domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use super::notes::NotesLog;

/// Priority of a corrective action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl ActionPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPriority::Critical => "critical",
            ActionPriority::High => "high",
            ActionPriority::Medium => "medium",
            ActionPriority::Low => "low",
        }
    }
}

impl std::fmt::Display for ActionPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(ActionPriority::Critical),
            "high" => Ok(ActionPriority::High),
            "medium" => Ok(ActionPriority::Medium),
            "low" => Ok(ActionPriority::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// Status of a corrective action (and, mirrored, of its assignment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::InProgress => "in_progress",
            ActionStatus::Completed => "completed",
            ActionStatus::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ActionStatus::Pending),
            "in_progress" => Ok(ActionStatus::InProgress),
            "completed" => Ok(ActionStatus::Completed),
            "overdue" => Ok(ActionStatus::Overdue),
            _ => Err(format!("Unknown action status: {}", s)),
        }
    }
}

/// A remediation task raised against one audit asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectiveAction {
    pub id: i64,
    pub audit_asset_id: i64,
    pub audit_plan_id: i64,
    pub issue: String,
    pub action: String,
    pub assigned_to: Option<i64>,
    pub priority: ActionPriority,
    pub status: ActionStatus,
    pub due_date: NaiveDate,
    pub completed_date: Option<DateTime<Utc>>,
    pub notes: NotesLog,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CorrectiveAction {
    pub fn is_completed(&self) -> bool {
        self.status == ActionStatus::Completed
    }

    /// Past due and not completed, whatever the stored status says.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed() && self.due_date < today
    }

    /// Pending or in progress.
    pub fn is_active(&self) -> bool {
        matches!(self.status, ActionStatus::Pending | ActionStatus::InProgress)
    }

    /// Moves the action to `status`, keeping `completed_date` in step and
    /// appending one line to the notes log.
    ///
    /// Returns `false` when nothing changed (same status, no note).
    pub fn transition(
        &mut self,
        status: ActionStatus,
        at: DateTime<Utc>,
        note: Option<&str>,
    ) -> bool {
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        if status == self.status && note.is_none() {
            return false;
        }

        let line = if status == self.status {
            note.unwrap_or_default().to_string()
        } else {
            match note {
                Some(note) => format!("Status changed from {} to {}: {}", self.status, status, note),
                None => format!("Status changed from {} to {}", self.status, status),
            }
        };

        self.status = status;
        self.completed_date = if status == ActionStatus::Completed {
            self.completed_date.or(Some(at))
        } else {
            None
        };
        self.notes.append(at, line);
        self.updated_at = at;
        true
    }
}

/// Corrective action row to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCorrectiveAction {
    pub audit_asset_id: i64,
    pub audit_plan_id: i64,
    pub issue: String,
    pub action: String,
    pub assigned_to: Option<i64>,
    pub priority: ActionPriority,
    pub due_date: NaiveDate,
    pub notes: NotesLog,
    pub created_at: DateTime<Utc>,
}

/// Secondary binding of a corrective action to the audit assignment of the
/// auditor responsible for the asset's location.
///
/// Its status mirrors the parent action; the parent is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectiveActionAssignment {
    pub id: i64,
    pub corrective_action_id: i64,
    pub audit_assignment_id: i64,
    pub auditor_id: i64,
    pub status: ActionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_notes: NotesLog,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CorrectiveActionAssignment {
    /// Copies the parent's status, stamping start/completion times.
    pub fn mirror(&mut self, status: ActionStatus, at: DateTime<Utc>, note: Option<&str>) {
        if self.status == status {
            return;
        }

        match status {
            ActionStatus::InProgress => {
                self.started_at.get_or_insert(at);
                self.completed_at = None;
            }
            ActionStatus::Completed => {
                self.started_at.get_or_insert(at);
                self.completed_at = Some(at);
            }
            ActionStatus::Pending | ActionStatus::Overdue => {
                self.completed_at = None;
            }
        }

        let line = match note.map(str::trim).filter(|n| !n.is_empty()) {
            Some(note) => format!("{} -> {}: {}", self.status, status, note),
            None => format!("{} -> {}", self.status, status),
        };
        self.progress_notes.append(at, line);
        self.status = status;
        self.updated_at = at;
    }
}

/// Assignment row inserted together with its parent action; the store
/// fills in the parent id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCorrectiveActionAssignment {
    pub audit_assignment_id: i64,
    pub auditor_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating a corrective action manually.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCorrectiveActionRequest {
    pub audit_asset_id: i64,

    #[validate(length(min = 1, max = 2000, message = "Issue must be 1-2000 characters"))]
    pub issue: String,

    #[validate(length(min = 1, max = 2000, message = "Action must be 1-2000 characters"))]
    pub action: String,

    #[serde(default)]
    pub assigned_to: Option<i64>,

    #[serde(default)]
    pub priority: Option<ActionPriority>,

    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Request payload for changing one action's status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActionStatusRequest {
    pub status: ActionStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request payload for changing several actions' status at once.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusUpdateRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 ids are required"))]
    pub ids: Vec<i64>,
    pub status: ActionStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request payload for notifying the assignees of selected actions.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkNotificationRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 ids are required"))]
    pub ids: Vec<i64>,
}

/// Outcome of one id inside a bulk status update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusItemResult {
    pub id: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for a bulk status update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusUpdateResponse {
    pub updated: usize,
    pub failed: usize,
    pub results: Vec<BulkStatusItemResult>,
}

/// Corrective action counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectiveActionCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl CorrectiveActionCounts {
    pub fn tally<'a>(actions: impl IntoIterator<Item = &'a CorrectiveAction>) -> Self {
        let mut counts = Self::default();
        for action in actions {
            counts.total += 1;
            match action.status {
                ActionStatus::Pending => counts.pending += 1,
                ActionStatus::InProgress => counts.in_progress += 1,
                ActionStatus::Completed => counts.completed += 1,
                ActionStatus::Overdue => counts.overdue += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn action() -> CorrectiveAction {
        let created = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
        CorrectiveAction {
            id: 1,
            audit_asset_id: 1,
            audit_plan_id: 1,
            issue: "Asset reported missing".to_string(),
            action: "Locate the asset".to_string(),
            assigned_to: Some(10),
            priority: ActionPriority::High,
            status: ActionStatus::Pending,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            completed_date: None,
            notes: NotesLog::new(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("in_progress".parse::<ActionStatus>(), Ok(ActionStatus::InProgress));
        assert_eq!(ActionStatus::Overdue.to_string(), "overdue");
        assert!("done".parse::<ActionStatus>().is_err());
    }

    #[test]
    fn test_priority_order() {
        assert!(ActionPriority::Critical < ActionPriority::Low);
        assert_eq!("HIGH".parse::<ActionPriority>(), Ok(ActionPriority::High));
    }

    #[test]
    fn test_transition_to_completed_sets_completed_date() {
        let mut a = action();
        let at = Utc.with_ymd_and_hms(2025, 1, 12, 15, 0, 0).unwrap();
        assert!(a.transition(ActionStatus::Completed, at, Some("Found in storage")));
        assert_eq!(a.status, ActionStatus::Completed);
        assert_eq!(a.completed_date, Some(at));
        assert_eq!(a.notes.len(), 1);
        assert_eq!(
            a.notes.last().unwrap().text,
            "Status changed from pending to completed: Found in storage"
        );
    }

    #[test]
    fn test_transition_away_from_completed_clears_date() {
        let mut a = action();
        let at = Utc.with_ymd_and_hms(2025, 1, 12, 15, 0, 0).unwrap();
        a.transition(ActionStatus::Completed, at, None);
        a.transition(ActionStatus::InProgress, at, None);
        assert_eq!(a.completed_date, None);
        assert_eq!(a.notes.len(), 2);
    }

    #[test]
    fn test_transition_noop() {
        let mut a = action();
        assert!(!a.transition(ActionStatus::Pending, Utc::now(), None));
        assert!(a.notes.is_empty());
    }

    #[test]
    fn test_transition_same_status_with_note_appends() {
        let mut a = action();
        assert!(a.transition(ActionStatus::Pending, Utc::now(), Some("Called the owner")));
        assert_eq!(a.notes.last().unwrap().text, "Called the owner");
    }

    #[test]
    fn test_is_overdue() {
        let mut a = action();
        assert!(!a.is_overdue(NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()));
        assert!(a.is_overdue(NaiveDate::from_ymd_opt(2025, 1, 18).unwrap()));
        a.status = ActionStatus::Completed;
        assert!(!a.is_overdue(NaiveDate::from_ymd_opt(2025, 1, 18).unwrap()));
    }

    #[test]
    fn test_assignment_mirror() {
        let now = Utc::now();
        let mut assignment = CorrectiveActionAssignment {
            id: 1,
            corrective_action_id: 1,
            audit_assignment_id: 1,
            auditor_id: 10,
            status: ActionStatus::Pending,
            started_at: None,
            completed_at: None,
            progress_notes: NotesLog::new(),
            created_at: now,
            updated_at: now,
        };

        assignment.mirror(ActionStatus::Completed, now, None);
        assert_eq!(assignment.status, ActionStatus::Completed);
        assert_eq!(assignment.started_at, Some(now));
        assert_eq!(assignment.completed_at, Some(now));
        assert_eq!(assignment.progress_notes.len(), 1);

        assignment.mirror(ActionStatus::Completed, now, None);
        assert_eq!(assignment.progress_notes.len(), 1);
    }

    #[test]
    fn test_counts_tally() {
        let mut a = action();
        let b = action();
        a.status = ActionStatus::Completed;
        let counts = CorrectiveActionCounts::tally([&a, &b]);
        assert_eq!(counts.total, 2);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.pending, 1);
    }
}
