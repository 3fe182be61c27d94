//! Location repository for database operations.

use sqlx::PgPool;

use crate::entities::LocationEntity;
use crate::metrics::QueryTimer;

/// Repository for location-related database operations.
#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    /// Creates a new LocationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<LocationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_locations_by_ids");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            SELECT id, name
            FROM locations
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }
}
