//! Audit asset endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use domain::models::Asset;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Actor;

/// Force the write-back of an audited asset, open actions notwithstanding.
///
/// POST /api/v1/audit-assets/:audit_asset_id/resolve
pub async fn resolve_audit_asset(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(audit_asset_id): Path<i64>,
) -> Result<Json<Asset>, ApiError> {
    let asset = state.audit_assets.mark_resolved(audit_asset_id, actor).await?;
    info!(audit_asset_id, asset_id = asset.id, "Audit asset resolved via API");
    Ok(Json(asset))
}
