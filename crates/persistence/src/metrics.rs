//! Database metrics collection.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record how long a store query took.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "audit_store_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Count a failed store query.
pub fn record_query_failure(query_name: &str) {
    counter!(
        "audit_store_query_failures_total",
        "query" => query_name.to_string()
    )
    .increment(1);
}

/// Record connection pool usage. Called periodically by the API's job
/// scheduler.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("audit_db_connections_active").set(active as f64);
    gauge!("audit_db_connections_idle").set(idle as f64);
    gauge!("audit_db_connections_total").set(size as f64);
}

/// Times one repository call.
///
/// ```ignore
/// let timer = QueryTimer::new("find_audit_plan_by_id");
/// let result = sqlx::query_as::<_, AuditPlanEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration.
    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }

    /// Record the elapsed duration and, on error, a failure.
    pub fn finish<T>(self, result: Result<T, sqlx::Error>) -> Result<T, sqlx::Error> {
        if result.is_err() {
            record_query_failure(self.query_name);
        }
        self.record();
        result
    }
}
