//! Liveness, readiness and a detailed health report.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;
use tracing::warn;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub store: StoreHealth,
    pub email: EmailHealth,
    pub jobs_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmailHealth {
    pub enabled: bool,
    pub provider: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

async fn check_store(state: &AppState) -> StoreHealth {
    let started = Instant::now();
    match state.ctx.store.ping().await {
        Ok(()) => StoreHealth {
            reachable: true,
            latency_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "Audit store ping failed");
            StoreHealth {
                reachable: false,
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// GET /api/health
///
/// 200 with `healthy`, or 503 with `degraded` when the store is unreachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let store = check_store(&state).await;
    let (code, status) = if store.reachable {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let report = HealthReport {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store,
        email: EmailHealth {
            enabled: state.config.email.enabled,
            provider: state.config.email.provider.clone(),
        },
        jobs_enabled: state.config.jobs.enabled,
    };
    (code, Json(report))
}

/// GET /api/health/live
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse { status: "alive" })
}

/// GET /api/health/ready
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    if check_store(&state).await.reachable {
        (StatusCode::OK, Json(StatusResponse { status: "ready" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(StatusResponse { status: "unavailable" }),
        )
    }
}
