//! Domain models for the asset audit workflow.

pub mod access;
pub mod asset;
pub mod asset_status;
pub mod audit_asset;
pub mod audit_assignment;
pub mod audit_log;
pub mod audit_plan;
pub mod corrective_action;
pub mod employee;
pub mod location;
pub mod notes;

pub use access::AccessGrant;
pub use asset::{Asset, AssetPatch};
pub use asset_status::AssetStatus;
pub use audit_asset::{AuditAsset, AuditAssetState, NewAuditAsset, StatusUpdateRequest};
pub use audit_assignment::{AssignmentStatus, AuditAssignment, NewAuditAssignment};
pub use audit_log::{ActorType, AuditAction, AuditLogEntry, FieldChange, NewAuditLogEntry};
pub use audit_plan::{AuditPlan, AuditPlanStatus, NewAuditPlan};
pub use corrective_action::{
    ActionPriority, ActionStatus, CorrectiveAction, CorrectiveActionAssignment,
    NewCorrectiveAction, NewCorrectiveActionAssignment,
};
pub use employee::Employee;
pub use location::Location;
pub use notes::{NoteEntry, NotesLog};
