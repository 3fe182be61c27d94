//! Corrective action endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use domain::models::corrective_action::{
    BulkNotificationRequest, BulkStatusUpdateRequest, BulkStatusUpdateResponse,
    CreateCorrectiveActionRequest, UpdateActionStatusRequest,
};
use domain::models::{AssetStatus, CorrectiveAction};
use domain::services::NotificationSummary;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Actor;

/// Status the canonical asset will take once the action's audit asset resolves.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStatusResponse {
    pub corrective_action_id: i64,
    pub resolution_status: AssetStatus,
}

/// Create a corrective action and notify its assignee.
///
/// POST /api/v1/corrective-actions
pub async fn create_corrective_action(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<CreateCorrectiveActionRequest>,
) -> Result<(StatusCode, Json<CorrectiveAction>), ApiError> {
    let action = state.corrective_actions.create(request, actor).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

/// GET /api/v1/corrective-actions/:action_id
pub async fn get_corrective_action(
    State(state): State<AppState>,
    Path(action_id): Path<i64>,
) -> Result<Json<CorrectiveAction>, ApiError> {
    Ok(Json(state.corrective_actions.find(action_id).await?))
}

/// Move one action to a new status. Completion resolves the audit asset
/// once every action on it is complete.
///
/// PUT /api/v1/corrective-actions/:action_id/status
pub async fn update_status(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(action_id): Path<i64>,
    Json(request): Json<UpdateActionStatusRequest>,
) -> Result<Json<CorrectiveAction>, ApiError> {
    let action = state
        .corrective_actions
        .update_status(action_id, request.status, request.notes.as_deref(), actor)
        .await?;
    Ok(Json(action))
}

/// GET /api/v1/corrective-actions/:action_id/resolution-status
pub async fn get_resolution_status(
    State(state): State<AppState>,
    Path(action_id): Path<i64>,
) -> Result<Json<ResolutionStatusResponse>, ApiError> {
    let resolution_status = state
        .corrective_actions
        .get_resolution_status(action_id)
        .await?;
    Ok(Json(ResolutionStatusResponse {
        corrective_action_id: action_id,
        resolution_status,
    }))
}

/// Per-id status change; failures for some ids do not fail the request.
///
/// POST /api/v1/corrective-actions/bulk-status
pub async fn bulk_update_status(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<BulkStatusUpdateRequest>,
) -> Result<Json<BulkStatusUpdateResponse>, ApiError> {
    let response = state
        .corrective_actions
        .bulk_update_status(request, actor)
        .await?;
    Ok(Json(response))
}

/// Mail the assignees of the selected actions, one mail per employee.
///
/// POST /api/v1/corrective-actions/bulk-notify
pub async fn bulk_notify(
    State(state): State<AppState>,
    Json(request): Json<BulkNotificationRequest>,
) -> Result<Json<NotificationSummary>, ApiError> {
    request.validate()?;
    let summary = state
        .action_notifier
        .send_bulk_notifications(&request.ids)
        .await?;
    info!(
        requested = request.ids.len(),
        employees_notified = summary.employees_notified,
        failed = summary.failed,
        "Bulk corrective action notification finished"
    );
    Ok(Json(summary))
}
