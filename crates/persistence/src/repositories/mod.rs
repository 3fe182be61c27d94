//! Repository implementations for database operations.

pub mod asset;
pub mod audit_asset;
pub mod audit_log;
pub mod audit_plan;
pub mod corrective_action;
pub mod employee;
pub mod location;

pub use asset::AssetRepository;
pub use audit_asset::AuditAssetRepository;
pub use audit_log::AuditLogRepository;
pub use audit_plan::{AuditPlanRepository, FanOutRows};
pub use corrective_action::CorrectiveActionRepository;
pub use employee::EmployeeRepository;
pub use location::LocationRepository;
