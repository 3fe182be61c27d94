//! Corrective action sweeps: overdue marking with reminders, and the
//! periodic nudge for open actions.

use tracing::info;

use domain::services::{CorrectiveActionNotifier, CorrectiveActionService};

use super::scheduler::{Job, JobError, JobFrequency};

/// Marks past-due actions overdue, then mails their assignees.
pub struct OverdueSweepJob {
    actions: CorrectiveActionService,
    notifier: CorrectiveActionNotifier,
}

impl OverdueSweepJob {
    pub fn new(actions: CorrectiveActionService, notifier: CorrectiveActionNotifier) -> Self {
        Self { actions, notifier }
    }
}

#[async_trait::async_trait]
impl Job for OverdueSweepJob {
    fn name(&self) -> &'static str {
        "corrective_action_overdue"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<(), JobError> {
        let marked = self.actions.mark_overdue_actions().await?;
        let summary = self.notifier.send_overdue_reminders().await?;
        info!(
            marked_overdue = marked.len(),
            employees_notified = summary.employees_notified,
            failed = summary.failed,
            "Overdue corrective action sweep finished"
        );
        Ok(())
    }
}

/// Weekly reminder for pending and in-progress actions not yet due.
pub struct ScheduledReminderJob {
    notifier: CorrectiveActionNotifier,
}

impl ScheduledReminderJob {
    pub fn new(notifier: CorrectiveActionNotifier) -> Self {
        Self { notifier }
    }
}

#[async_trait::async_trait]
impl Job for ScheduledReminderJob {
    fn name(&self) -> &'static str {
        "corrective_action_scheduled"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Weekly
    }

    async fn execute(&self) -> Result<(), JobError> {
        let summary = self.notifier.send_scheduled_reminders().await?;
        info!(
            total_actions = summary.total_actions,
            employees_notified = summary.employees_notified,
            failed = summary.failed,
            "Scheduled corrective action reminders finished"
        );
        Ok(())
    }
}
