//! Employee portal endpoint handlers.
//!
//! Every portal call carries the access token in its body; the token is
//! re-validated against the clock and plan access on each request.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use domain::models::access::{
    AccessTokenResponse, IssueAccessTokenRequest, PortalAccessRequest, PortalStatusUpdate,
};
use domain::models::audit_asset::AuditAssetView;
use domain::models::AuditPlan;
use domain::services::SubmissionResult;

use crate::app::AppState;
use crate::error::ApiError;

/// What an employee sees on opening the portal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSession {
    pub employee_id: i64,
    pub audit_plan_id: i64,
    pub expires_at: DateTime<Utc>,
    pub plan: AuditPlan,
    pub audit_assets: Vec<AuditAssetView>,
}

/// Issue a portal token for an employee within a plan.
///
/// POST /api/v1/access-tokens
pub async fn issue_access_token(
    State(state): State<AppState>,
    Json(request): Json<IssueAccessTokenRequest>,
) -> Result<(StatusCode, Json<AccessTokenResponse>), ApiError> {
    let issued = state
        .access
        .issue_token(request.employee_id, request.audit_plan_id)
        .await?;

    let response = AccessTokenResponse {
        portal_url: state.ctx.settings.portal_url(&issued.token),
        token: issued.token,
        employee_id: issued.grant.employee_id,
        audit_plan_id: issued.grant.audit_plan_id,
        expires_at: issued.grant.expires_at,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Resolve a token to the employee's plan and visible audit assets.
///
/// POST /api/v1/portal/access
pub async fn open_portal(
    State(state): State<AppState>,
    Json(request): Json<PortalAccessRequest>,
) -> Result<Json<PortalSession>, ApiError> {
    let grant = state.access.authorize(&request.token).await?;
    let plan = state.plans.find_plan(grant.audit_plan_id).await?;
    let audit_assets = state
        .audit_assets
        .visible_audit_assets(grant.audit_plan_id, grant.employee_id)
        .await?;

    Ok(Json(PortalSession {
        employee_id: grant.employee_id,
        audit_plan_id: grant.audit_plan_id,
        expires_at: grant.expires_at,
        plan,
        audit_assets,
    }))
}

/// Submit a status for one audit asset.
///
/// POST /api/v1/portal/status
pub async fn submit_status(
    State(state): State<AppState>,
    Json(request): Json<PortalStatusUpdate>,
) -> Result<Json<SubmissionResult>, ApiError> {
    let grant = state.access.authorize(&request.token).await?;
    let result = state
        .audit_assets
        .submit_status(&grant, &request.update)
        .await?;

    info!(
        employee_id = grant.employee_id,
        audit_asset_id = result.audit_asset.id,
        status = %result.audit_asset.current_status,
        corrective_action_id = ?result.corrective_action.as_ref().map(|a| a.id),
        "Audit status submitted via portal"
    );
    Ok(Json(result))
}

/// Forget a portal token.
///
/// POST /api/v1/portal/logout
pub async fn revoke_access_token(
    State(state): State<AppState>,
    Json(request): Json<PortalAccessRequest>,
) -> Result<StatusCode, ApiError> {
    state.access.revoke_token(&request.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
