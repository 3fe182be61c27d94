use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use asset_audit_api::app;
use asset_audit_api::config::Config;
use asset_audit_api::jobs::{
    AuditReminderJob, JobFrequency, JobScheduler, OverdueSweepJob, PoolMetricsJob,
    ScheduledReminderJob,
};
use asset_audit_api::middleware;
use asset_audit_api::services::EmailService;
use domain::services::{
    AuditContext, AuditNotificationService, CorrectiveActionNotifier, CorrectiveActionService,
    InMemoryTokenCache, SystemClock,
};
use persistence::PgAuditStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics().context("Failed to install Prometheus recorder")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting asset audit API");

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;
    persistence::db::run_migrations(&pool).await?;

    let mailer = EmailService::new(config.email.clone()).context("Failed to set up email")?;
    if !mailer.is_enabled() {
        warn!("Email is disabled; audit and corrective action mail will fail to send");
    }

    let ctx = AuditContext {
        store: Arc::new(PgAuditStore::new(pool.clone())),
        mailer: Arc::new(mailer),
        tokens: Arc::new(InMemoryTokenCache::new()),
        clock: Arc::new(SystemClock),
        settings: config.audit_settings(),
    };

    let mut scheduler = JobScheduler::new();
    if config.jobs.enabled {
        let reminder_frequency = JobFrequency::from_name(&config.jobs.reminder_frequency)
            .unwrap_or_else(|| {
                warn!(
                    frequency = %config.jobs.reminder_frequency,
                    "Unknown reminder frequency, using daily"
                );
                JobFrequency::Daily
            });
        scheduler.register(AuditReminderJob::new(
            AuditNotificationService::new(ctx.clone()),
            reminder_frequency,
        ));
        scheduler.register(OverdueSweepJob::new(
            CorrectiveActionService::new(ctx.clone()),
            CorrectiveActionNotifier::new(ctx.clone()),
        ));
        scheduler.register(ScheduledReminderJob::new(CorrectiveActionNotifier::new(
            ctx.clone(),
        )));
        scheduler.register(PoolMetricsJob::new(pool.clone()));
        scheduler.start();
    }

    let addr = config.socket_addr()?;
    let app = app::create_app(config, ctx);

    info!(%addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;
    pool.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
