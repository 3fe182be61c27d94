//! Audit reminder sweep.

use tracing::info;

use domain::services::AuditNotificationService;

use super::scheduler::{Job, JobError, JobFrequency};

/// Sends exact-day reminders for every active audit plan.
pub struct AuditReminderJob {
    service: AuditNotificationService,
    frequency: JobFrequency,
}

impl AuditReminderJob {
    pub fn new(service: AuditNotificationService, frequency: JobFrequency) -> Self {
        Self { service, frequency }
    }
}

#[async_trait::async_trait]
impl Job for AuditReminderJob {
    fn name(&self) -> &'static str {
        "audit_reminders"
    }

    fn frequency(&self) -> JobFrequency {
        self.frequency
    }

    async fn execute(&self) -> Result<(), JobError> {
        let summary = self.service.send_reminders().await?;
        info!(
            plans_checked = summary.plans_checked,
            plans_due = summary.plans_due,
            reminders_sent = summary.reminders_sent,
            failed = summary.failed,
            "Audit reminder sweep finished"
        );
        Ok(())
    }
}
