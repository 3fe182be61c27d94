//! Domain services for the asset audit workflow.
//!
//! Every service is built from an [`AuditContext`] and reaches the outside
//! world only through the collaborator traits it carries.

pub mod access;
pub mod audit;
pub mod audit_asset;
pub mod audit_notification;
pub mod audit_plan;
pub mod clock;
pub mod context;
pub mod corrective_action;
pub mod corrective_action_notification;
pub mod notification;
pub mod resolution;

pub use access::{AccessService, InMemoryTokenCache, IssuedToken, TokenCache};
pub use audit::{audit_helpers, AuditLogBuilder};
pub use audit_asset::{AuditAssetService, SubmissionResult};
pub use audit_notification::{AuditNotificationService, ReminderSummary};
pub use audit_plan::{AuditPlanCompletion, AuditPlanService};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{AuditContext, AuditSettings};
pub use corrective_action::{default_due_date, CorrectiveActionService};
pub use corrective_action_notification::{
    CorrectiveActionNotifier, EmployeeNotification, NotificationSummary,
};
pub use notification::{
    ActionSummary, MailData, MailError, MailTemplate, MailTransport, MockMailTransport,
    OutboundMail,
};
pub use resolution::{
    resolution_status, resolution_status_for, Discrepancy, ResolutionEngine, ResolutionOutcome,
};
