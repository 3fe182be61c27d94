//! Employee repository for database operations.

use sqlx::PgPool;

use crate::entities::EmployeeEntity;
use crate::metrics::QueryTimer;

/// Repository for employee lookups. Employees are owned by the directory
/// system; the audit workflow only reads them.
#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    /// Creates a new EmployeeRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<EmployeeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_employee_by_id");
        let result = sqlx::query_as::<_, EmployeeEntity>(
            r#"
            SELECT id, name, email, department, created_at
            FROM employees
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<EmployeeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_employees_by_ids");
        let result = sqlx::query_as::<_, EmployeeEntity>(
            r#"
            SELECT id, name, email, department, created_at
            FROM employees
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Exact name match. With duplicate names the oldest employee wins.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<EmployeeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_employee_by_name");
        let result = sqlx::query_as::<_, EmployeeEntity>(
            r#"
            SELECT id, name, email, department, created_at
            FROM employees
            WHERE name = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }
}
