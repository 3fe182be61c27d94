//! Audit plan endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use domain::models::audit_plan::{
    AuditPlanCreatedResponse, AuditPlanStatistics, CreateAuditPlanRequest,
};
use domain::models::{AuditAsset, AuditPlan, CorrectiveAction};
use domain::services::{AuditPlanCompletion, Discrepancy};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Actor;

/// Create an audit plan with its assignments and asset snapshots.
///
/// POST /api/v1/audit-plans
pub async fn create_audit_plan(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<CreateAuditPlanRequest>,
) -> Result<(StatusCode, Json<AuditPlanCreatedResponse>), ApiError> {
    let response = state.plans.create_audit_plan(request, actor).await?;
    info!(
        audit_plan_id = response.plan.id,
        assignments = response.assignment_count,
        audit_assets = response.audit_asset_count,
        "Audit plan created via API"
    );
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/audit-plans/:plan_id
pub async fn get_audit_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> Result<Json<AuditPlan>, ApiError> {
    Ok(Json(state.plans.find_plan(plan_id).await?))
}

/// GET /api/v1/audit-plans/:plan_id/statistics
pub async fn get_statistics(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> Result<Json<AuditPlanStatistics>, ApiError> {
    Ok(Json(state.plans.statistics(plan_id).await?))
}

/// Close a plan. Completing a completed plan is a no-op.
///
/// POST /api/v1/audit-plans/:plan_id/complete
pub async fn complete_audit_plan(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(plan_id): Path<i64>,
) -> Result<Json<AuditPlanCompletion>, ApiError> {
    Ok(Json(state.plans.complete_audit_plan(plan_id, actor).await?))
}

/// Filters for the audit asset listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditAssetFilter {
    /// Only assets nobody has submitted a status for yet.
    #[serde(default)]
    pub unaudited: bool,
    /// Only assets with a discrepancy.
    #[serde(default)]
    pub discrepancies: bool,
}

/// GET /api/v1/audit-plans/:plan_id/assets
pub async fn list_audit_assets(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Query(filter): Query<AuditAssetFilter>,
) -> Result<Json<Vec<AuditAsset>>, ApiError> {
    state.plans.find_plan(plan_id).await?;
    let audit_assets = state
        .ctx
        .store
        .audit_assets_for_plan(plan_id)
        .await
        .map_err(domain::AuditError::from)?
        .into_iter()
        .filter(|a| !filter.unaudited || !a.is_audited())
        .filter(|a| !filter.discrepancies || Discrepancy::of(a).is_some())
        .collect();
    Ok(Json(audit_assets))
}

/// GET /api/v1/audit-plans/:plan_id/corrective-actions
pub async fn list_corrective_actions(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> Result<Json<Vec<CorrectiveAction>>, ApiError> {
    state.plans.find_plan(plan_id).await?;
    Ok(Json(state.corrective_actions.list_for_plan(plan_id).await?))
}
