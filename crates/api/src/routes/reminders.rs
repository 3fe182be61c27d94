//! Manual reminder triggers. The same sweeps run on the job scheduler.

use axum::{extract::State, Json};
use serde::Serialize;

use domain::services::{NotificationSummary, ReminderSummary};

use crate::app::AppState;
use crate::error::ApiError;

/// Result of an overdue sweep.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueSweepResponse {
    /// Actions moved to overdue by this sweep.
    pub marked_overdue: usize,
    pub notifications: NotificationSummary,
}

/// POST /api/v1/reminders/audit
pub async fn send_audit_reminders(
    State(state): State<AppState>,
) -> Result<Json<ReminderSummary>, ApiError> {
    Ok(Json(state.audit_notifications.send_reminders().await?))
}

/// POST /api/v1/reminders/corrective-actions/overdue
pub async fn send_overdue_reminders(
    State(state): State<AppState>,
) -> Result<Json<OverdueSweepResponse>, ApiError> {
    let marked = state.corrective_actions.mark_overdue_actions().await?;
    let notifications = state.action_notifier.send_overdue_reminders().await?;
    Ok(Json(OverdueSweepResponse {
        marked_overdue: marked.len(),
        notifications,
    }))
}

/// POST /api/v1/reminders/corrective-actions/scheduled
pub async fn send_scheduled_reminders(
    State(state): State<AppState>,
) -> Result<Json<NotificationSummary>, ApiError> {
    Ok(Json(state.action_notifier.send_scheduled_reminders().await?))
}
