//! Consolidated corrective action mail.
//!
//! Every batch entry point groups its actions by recipient before sending,
//! so an employee receives at most one mail per run however many actions
//! they hold.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::context::AuditContext;
use super::notification::{ActionSummary, MailData, MailTemplate, OutboundMail};
use crate::error::AuditResult;
use crate::models::{CorrectiveAction, Employee};

/// Outcome of one recipient's mail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeNotification {
    pub employee_id: i64,
    pub action_ids: Vec<i64>,
    pub action_count: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate result of a notification run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSummary {
    /// Actions selected for the run.
    pub total_actions: usize,
    /// Employees whose mail was sent.
    pub employees_notified: usize,
    /// Employees whose mail failed.
    pub failed: usize,
    /// Actions with no resolvable recipient.
    pub dropped: usize,
    /// Per-employee breakdown ordered by employee id.
    pub per_employee: Vec<EmployeeNotification>,
}

/// Sends corrective action mail, consolidated per recipient.
#[derive(Debug, Clone)]
pub struct CorrectiveActionNotifier {
    ctx: AuditContext,
}

impl CorrectiveActionNotifier {
    pub fn new(ctx: AuditContext) -> Self {
        Self { ctx }
    }

    /// Actions past due and not completed.
    pub async fn send_overdue_reminders(&self) -> AuditResult<NotificationSummary> {
        let today = self.ctx.clock.today();
        let actions = self.ctx.store.overdue_corrective_actions(today).await?;
        info!(count = actions.len(), "Sending overdue corrective action reminders");
        self.send_consolidated(actions, MailTemplate::CorrectiveActionOverdue)
            .await
    }

    /// Pending or in-progress actions that are not yet due.
    pub async fn send_scheduled_reminders(&self) -> AuditResult<NotificationSummary> {
        let today = self.ctx.clock.today();
        let actions = self.ctx.store.upcoming_corrective_actions(today).await?;
        info!(count = actions.len(), "Sending scheduled corrective action reminders");
        self.send_consolidated(actions, MailTemplate::CorrectiveActionReminder)
            .await
    }

    /// Explicitly selected actions. Unknown ids are ignored.
    pub async fn send_bulk_notifications(&self, ids: &[i64]) -> AuditResult<NotificationSummary> {
        let actions = self.ctx.store.find_corrective_actions(ids).await?;
        if actions.len() < ids.len() {
            warn!(
                requested = ids.len(),
                found = actions.len(),
                "Some corrective actions for bulk notification were not found"
            );
        }
        self.send_consolidated(actions, MailTemplate::CorrectiveActionReminder)
            .await
    }

    /// Individual mail for one new or updated action.
    ///
    /// Returns whether a mail was sent. Failures are logged, never returned.
    pub async fn send_corrective_action_notification(&self, action: &CorrectiveAction) -> bool {
        let recipients = match self.resolve_recipients(std::slice::from_ref(action)).await {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!(action_id = action.id, error = %e, "Could not resolve notification recipient");
                return false;
            }
        };
        let Some(employee_id) = recipients.get(&action.id).copied().flatten() else {
            warn!(action_id = action.id, "Corrective action has no recipient, skipping mail");
            return false;
        };
        let employee = match self.ctx.store.find_employee(employee_id).await {
            Ok(Some(employee)) => employee,
            Ok(None) => {
                warn!(action_id = action.id, employee_id, "Recipient employee not found");
                return false;
            }
            Err(e) => {
                warn!(action_id = action.id, error = %e, "Could not load recipient");
                return false;
            }
        };

        let result = match build_mail(
            &employee,
            MailTemplate::CorrectiveActionAssigned,
            vec![ActionSummary::from(action)],
        ) {
            Some(mail) => self.ctx.mailer.send(&mail).await.map_err(|e| e.to_string()),
            None => Err("No email address on file".to_string()),
        };
        match result {
            Ok(()) => {
                info!(action_id = action.id, employee_id, "Sent corrective action notification");
                true
            }
            Err(e) => {
                warn!(action_id = action.id, employee_id, error = %e, "Corrective action notification failed");
                false
            }
        }
    }

    /// Groups `actions` by recipient and sends one mail per employee.
    ///
    /// Sends run concurrently; one failure never stops the others.
    pub async fn send_consolidated(
        &self,
        actions: Vec<CorrectiveAction>,
        template: MailTemplate,
    ) -> AuditResult<NotificationSummary> {
        let mut summary = NotificationSummary {
            total_actions: actions.len(),
            ..NotificationSummary::default()
        };
        if actions.is_empty() {
            return Ok(summary);
        }

        let recipients = self.resolve_recipients(&actions).await?;
        let mut groups: BTreeMap<i64, Vec<CorrectiveAction>> = BTreeMap::new();
        for action in actions {
            match recipients.get(&action.id).copied().flatten() {
                Some(employee_id) => groups.entry(employee_id).or_default().push(action),
                None => {
                    warn!(
                        action_id = action.id,
                        "Corrective action has neither assignee nor asset owner, dropping"
                    );
                    summary.dropped += 1;
                }
            }
        }

        let employee_ids: Vec<i64> = groups.keys().copied().collect();
        let employees: HashMap<i64, Employee> = self
            .ctx
            .store
            .find_employees(&employee_ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

        let mut sends = JoinSet::new();
        for (employee_id, group) in groups {
            let action_ids: Vec<i64> = group.iter().map(|a| a.id).collect();
            let summaries: Vec<ActionSummary> = group.iter().map(ActionSummary::from).collect();
            let mail = employees
                .get(&employee_id)
                .and_then(|employee| build_mail(employee, template, summaries));

            let Some(mail) = mail else {
                warn!(employee_id, "Recipient has no email address on file");
                summary.per_employee.push(EmployeeNotification {
                    employee_id,
                    action_count: action_ids.len(),
                    action_ids,
                    success: false,
                    error: Some("No email address on file".to_string()),
                });
                continue;
            };

            let mailer = self.ctx.mailer.clone();
            sends.spawn(async move {
                let result = mailer.send(&mail).await;
                (employee_id, action_ids, result)
            });
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((employee_id, action_ids, result)) => {
                    let (success, error) = match result {
                        Ok(()) => {
                            debug!(employee_id, actions = action_ids.len(), "Sent consolidated mail");
                            (true, None)
                        }
                        Err(e) => {
                            warn!(employee_id, error = %e, "Consolidated mail failed");
                            (false, Some(e.to_string()))
                        }
                    };
                    summary.per_employee.push(EmployeeNotification {
                        employee_id,
                        action_count: action_ids.len(),
                        action_ids,
                        success,
                        error,
                    });
                }
                Err(e) => error!(error = %e, "Mail task aborted"),
            }
        }

        summary.per_employee.sort_by_key(|r| r.employee_id);
        summary.employees_notified = summary.per_employee.iter().filter(|r| r.success).count();
        summary.failed = summary.per_employee.iter().filter(|r| !r.success).count();

        info!(
            template = %template,
            total_actions = summary.total_actions,
            employees_notified = summary.employees_notified,
            failed = summary.failed,
            dropped = summary.dropped,
            "Corrective action notification run finished"
        );
        Ok(summary)
    }

    /// Recipient per action id: `assigned_to`, else the canonical asset's
    /// owner, else none.
    async fn resolve_recipients(
        &self,
        actions: &[CorrectiveAction],
    ) -> AuditResult<HashMap<i64, Option<i64>>> {
        let store = &self.ctx.store;
        let mut recipients = HashMap::with_capacity(actions.len());
        let mut unassigned = Vec::new();
        for action in actions {
            match action.assigned_to {
                Some(employee_id) => {
                    recipients.insert(action.id, Some(employee_id));
                }
                None => unassigned.push(action),
            }
        }
        if unassigned.is_empty() {
            return Ok(recipients);
        }

        let mut asset_of_audit_asset: HashMap<i64, i64> = HashMap::new();
        for action in &unassigned {
            if asset_of_audit_asset.contains_key(&action.audit_asset_id) {
                continue;
            }
            if let Some(audit_asset) = store.find_audit_asset(action.audit_asset_id).await? {
                asset_of_audit_asset.insert(audit_asset.id, audit_asset.asset_id);
            }
        }
        let asset_ids: Vec<i64> = asset_of_audit_asset.values().copied().collect();
        let owners: HashMap<i64, Option<i64>> = store
            .find_assets(&asset_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a.user_id))
            .collect();

        for action in unassigned {
            let owner = asset_of_audit_asset
                .get(&action.audit_asset_id)
                .and_then(|asset_id| owners.get(asset_id).copied().flatten());
            recipients.insert(action.id, owner);
        }
        Ok(recipients)
    }
}

fn build_mail(
    employee: &Employee,
    template: MailTemplate,
    actions: Vec<ActionSummary>,
) -> Option<OutboundMail> {
    let to = employee.mail_address()?.to_string();
    Some(OutboundMail {
        to,
        to_name: employee.name.clone(),
        template,
        data: MailData::CorrectiveActions { actions },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionPriority, NewCorrectiveAction, NotesLog};
    use crate::services::Clock;
    use crate::store::AuditStore;
    use crate::test_support::{date, Fixture};
    use chrono::NaiveDate;

    async fn action(
        fx: &Fixture,
        audit_asset_id: i64,
        assigned_to: Option<i64>,
        due: NaiveDate,
    ) -> CorrectiveAction {
        let (action, _) = fx
            .store
            .insert_corrective_action(
                NewCorrectiveAction {
                    audit_asset_id,
                    audit_plan_id: fx.plan_id,
                    issue: "Asset reported missing".to_string(),
                    action: "Locate the asset".to_string(),
                    assigned_to,
                    priority: ActionPriority::High,
                    due_date: due,
                    notes: NotesLog::new(),
                    created_at: fx.clock.now(),
                },
                None,
            )
            .await
            .unwrap();
        action
    }

    #[tokio::test]
    async fn test_one_mail_per_employee() {
        let fx = Fixture::with_plan().await;
        let aa = fx.audit_asset_for(100).await.id;
        let due = date(2025, 1, 5);
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(action(&fx, aa, Some(20), due).await.id);
        }
        ids.push(action(&fx, aa, Some(21), due).await.id);

        let notifier = CorrectiveActionNotifier::new(fx.ctx.clone());
        let summary = notifier.send_overdue_reminders().await.unwrap();

        assert_eq!(summary.total_actions, 4);
        assert_eq!(summary.employees_notified, 2);
        let to_sato = fx.mailer.sent_to("sato@example.com");
        assert_eq!(to_sato.len(), 1);
        assert_eq!(to_sato[0].action_count(), 3);
        assert_eq!(to_sato[0].template, MailTemplate::CorrectiveActionOverdue);
        let to_suzuki = fx.mailer.sent_to("suzuki@example.com");
        assert_eq!(to_suzuki.len(), 1);
        assert_eq!(to_suzuki[0].action_count(), 1);

        let bulk = notifier.send_bulk_notifications(&ids).await.unwrap();
        assert_eq!(bulk.employees_notified, 2);
        assert_eq!(fx.mailer.sent_to("sato@example.com").len(), 2);
    }

    #[tokio::test]
    async fn test_falls_back_to_asset_owner() {
        let fx = Fixture::with_plan().await;
        let aa = fx.audit_asset_for(100).await.id;
        action(&fx, aa, None, date(2025, 1, 20)).await;

        let notifier = CorrectiveActionNotifier::new(fx.ctx.clone());
        let summary = notifier.send_scheduled_reminders().await.unwrap();

        assert_eq!(summary.employees_notified, 1);
        assert_eq!(summary.per_employee[0].employee_id, fx.owner_id);
        assert_eq!(fx.mailer.sent_to("sato@example.com").len(), 1);
    }

    #[tokio::test]
    async fn test_no_recipient_is_dropped() {
        let fx = Fixture::with_plan().await;
        let unowned = fx.audit_asset_for(101).await.id;
        action(&fx, unowned, None, date(2025, 1, 20)).await;

        let notifier = CorrectiveActionNotifier::new(fx.ctx.clone());
        let summary = notifier.send_scheduled_reminders().await.unwrap();

        assert_eq!(summary.total_actions, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.employees_notified, 0);
        assert!(fx.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let fx = Fixture::with_plan().await;
        let aa = fx.audit_asset_for(100).await.id;
        let due = date(2025, 1, 20);
        let a = action(&fx, aa, Some(20), due).await;
        let b = action(&fx, aa, Some(21), due).await;
        fx.mailer.fail_for("sato@example.com");

        let notifier = CorrectiveActionNotifier::new(fx.ctx.clone());
        let summary = notifier.send_bulk_notifications(&[a.id, b.id]).await.unwrap();

        assert_eq!(summary.employees_notified, 1);
        assert_eq!(summary.failed, 1);
        let failed = &summary.per_employee[0];
        assert_eq!(failed.employee_id, 20);
        assert!(!failed.success);
        assert!(failed.error.is_some());
        assert_eq!(fx.mailer.sent_to("suzuki@example.com").len(), 1);
    }

    #[tokio::test]
    async fn test_individual_send() {
        let fx = Fixture::with_plan().await;
        let aa = fx.audit_asset_for(100).await.id;
        let a = action(&fx, aa, Some(10), date(2025, 1, 20)).await;

        let notifier = CorrectiveActionNotifier::new(fx.ctx.clone());
        assert!(notifier.send_corrective_action_notification(&a).await);
        let sent = fx.mailer.sent_to("tanaka@example.com");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].template, MailTemplate::CorrectiveActionAssigned);
    }

    #[tokio::test]
    async fn test_scheduled_excludes_overdue() {
        let fx = Fixture::with_plan().await;
        let aa = fx.audit_asset_for(100).await.id;
        action(&fx, aa, Some(20), date(2025, 1, 5)).await;

        let notifier = CorrectiveActionNotifier::new(fx.ctx.clone());
        let summary = notifier.send_scheduled_reminders().await.unwrap();
        assert_eq!(summary.total_actions, 0);
        assert!(fx.mailer.sent().is_empty());
    }
}
