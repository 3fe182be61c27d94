//! Entity definitions (database row mappings).
//!
//! Status columns hold text; mapping a row onto its domain type can fail
//! when a value is outside the closed vocabulary, so the conversions are
//! `TryFrom` with [`StoreError::Decode`].

pub mod asset;
pub mod audit_asset;
pub mod audit_log;
pub mod audit_plan;
pub mod corrective_action;
pub mod employee;

pub use asset::AssetEntity;
pub use audit_asset::AuditAssetEntity;
pub use audit_log::AuditLogEntity;
pub use audit_plan::{AuditAssignmentEntity, AuditPlanEntity};
pub use corrective_action::{CorrectiveActionAssignmentEntity, CorrectiveActionEntity};
pub use employee::{EmployeeEntity, LocationEntity};

use domain::store::StoreError;
use std::str::FromStr;

/// Parses a text column into its domain enum.
pub(crate) fn decode<T>(column: &str, value: &str) -> Result<T, StoreError>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| StoreError::Decode(format!("{}: {}", column, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{ActionStatus, AssetStatus};

    #[test]
    fn test_decode_known_value() {
        let status: AssetStatus = decode("status", "保管中").unwrap();
        assert_eq!(status, AssetStatus::InStorage);
        let status: ActionStatus = decode("status", "in_progress").unwrap();
        assert_eq!(status, ActionStatus::InProgress);
    }

    #[test]
    fn test_decode_unknown_value() {
        let err = decode::<ActionStatus>("corrective_actions.status", "stalled").unwrap_err();
        assert!(matches!(err, StoreError::Decode(ref m) if m.starts_with("corrective_actions.status")));
    }
}
