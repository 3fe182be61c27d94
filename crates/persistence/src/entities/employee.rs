//! Employee and location entities.

use chrono::{DateTime, Utc};
use domain::models::{Employee, Location};
use sqlx::FromRow;

/// Database row mapping for the employees table.
#[derive(Debug, Clone, FromRow)]
pub struct EmployeeEntity {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<EmployeeEntity> for Employee {
    fn from(entity: EmployeeEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            email: entity.email,
            department: entity.department,
        }
    }
}

/// Database row mapping for the locations table.
#[derive(Debug, Clone, FromRow)]
pub struct LocationEntity {
    pub id: i64,
    pub name: String,
}

impl From<LocationEntity> for Location {
    fn from(entity: LocationEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
        }
    }
}
