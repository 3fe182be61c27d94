use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{
    AccessService, AuditAssetService, AuditContext, AuditNotificationService, AuditPlanService,
    CorrectiveActionNotifier, CorrectiveActionService,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{audit_assets, audit_plans, corrective_actions, health, portal, reminders};

/// Shared handler state: configuration plus the workflow services, all
/// built over one [`AuditContext`].
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ctx: AuditContext,
    pub access: AccessService,
    pub plans: AuditPlanService,
    pub audit_assets: AuditAssetService,
    pub corrective_actions: CorrectiveActionService,
    pub action_notifier: CorrectiveActionNotifier,
    pub audit_notifications: AuditNotificationService,
}

impl AppState {
    pub fn new(config: Arc<Config>, ctx: AuditContext) -> Self {
        Self {
            config,
            access: AccessService::new(ctx.clone()),
            plans: AuditPlanService::new(ctx.clone()),
            audit_assets: AuditAssetService::new(ctx.clone()),
            corrective_actions: CorrectiveActionService::new(ctx.clone()),
            action_notifier: CorrectiveActionNotifier::new(ctx.clone()),
            audit_notifications: AuditNotificationService::new(ctx.clone()),
            ctx,
        }
    }
}

pub fn create_app(config: Config, ctx: AuditContext) -> Router {
    let config = Arc::new(config);
    let state = AppState::new(config.clone(), ctx);

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Administrative routes; authentication is terminated upstream
    let admin_routes = Router::new()
        .route("/api/v1/audit-plans", post(audit_plans::create_audit_plan))
        .route("/api/v1/audit-plans/:plan_id", get(audit_plans::get_audit_plan))
        .route(
            "/api/v1/audit-plans/:plan_id/statistics",
            get(audit_plans::get_statistics),
        )
        .route(
            "/api/v1/audit-plans/:plan_id/complete",
            post(audit_plans::complete_audit_plan),
        )
        .route(
            "/api/v1/audit-plans/:plan_id/assets",
            get(audit_plans::list_audit_assets),
        )
        .route(
            "/api/v1/audit-plans/:plan_id/corrective-actions",
            get(audit_plans::list_corrective_actions),
        )
        .route("/api/v1/access-tokens", post(portal::issue_access_token))
        .route(
            "/api/v1/audit-assets/:audit_asset_id/resolve",
            post(audit_assets::resolve_audit_asset),
        )
        .route(
            "/api/v1/corrective-actions",
            post(corrective_actions::create_corrective_action),
        )
        .route(
            "/api/v1/corrective-actions/bulk-status",
            post(corrective_actions::bulk_update_status),
        )
        .route(
            "/api/v1/corrective-actions/bulk-notify",
            post(corrective_actions::bulk_notify),
        )
        .route(
            "/api/v1/corrective-actions/:action_id",
            get(corrective_actions::get_corrective_action),
        )
        .route(
            "/api/v1/corrective-actions/:action_id/status",
            put(corrective_actions::update_status),
        )
        .route(
            "/api/v1/corrective-actions/:action_id/resolution-status",
            get(corrective_actions::get_resolution_status),
        )
        .route("/api/v1/reminders/audit", post(reminders::send_audit_reminders))
        .route(
            "/api/v1/reminders/corrective-actions/overdue",
            post(reminders::send_overdue_reminders),
        )
        .route(
            "/api/v1/reminders/corrective-actions/scheduled",
            post(reminders::send_scheduled_reminders),
        );

    // Employee portal routes, gated by the access token in the body
    let portal_routes = Router::new()
        .route("/api/v1/portal/access", post(portal::open_portal))
        .route("/api/v1/portal/status", post(portal::submit_status))
        .route("/api/v1/portal/logout", post(portal::revoke_access_token));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(portal_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
