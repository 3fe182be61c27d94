//! Background job scheduler and job implementations.

mod audit_reminders;
mod corrective_action_reminders;
mod pool_metrics;
mod scheduler;

pub use audit_reminders::AuditReminderJob;
pub use corrective_action_reminders::{OverdueSweepJob, ScheduledReminderJob};
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{run_once, Job, JobError, JobFrequency, JobScheduler};
