//! Connection pool gauges for the audit store.

use sqlx::PgPool;
use tracing::{debug, warn};

use super::scheduler::{Job, JobError, JobFrequency};

/// Samples the pool every `interval_secs` and warns when it is saturated.
pub struct PoolMetricsJob {
    pool: PgPool,
    interval_secs: u64,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            interval_secs: 10,
        }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "audit_store_pool"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    fn run_on_start(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<(), JobError> {
        persistence::metrics::record_pool_metrics(&self.pool);

        let size = self.pool.size();
        let idle = self.pool.num_idle();
        if size > 0 && idle == 0 {
            warn!(size, "Audit store pool has no idle connections");
        } else {
            debug!(size, idle, "Audit store pool sampled");
        }
        Ok(())
    }
}
