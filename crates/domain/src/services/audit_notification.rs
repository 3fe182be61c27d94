//! Audit kickoff and reminder mail.
//!
//! Unlike corrective action mail these sends are always one per recipient
//! per plan; every mail carries a freshly minted portal token.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use super::access::AccessService;
use super::context::AuditContext;
use super::notification::{MailData, MailTemplate, OutboundMail};
use crate::error::AuditResult;
use crate::models::{AuditPlan, Employee};

/// Result of one reminder sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSummary {
    pub plans_checked: usize,
    pub plans_due: usize,
    pub reminders_sent: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct AuditNotificationService {
    ctx: AuditContext,
    access: AccessService,
}

impl AuditNotificationService {
    pub fn new(ctx: AuditContext) -> Self {
        Self {
            access: AccessService::new(ctx.clone()),
            ctx,
        }
    }

    /// Sends the kickoff mail for a new plan.
    ///
    /// Recipients are every owner of an asset at the covered locations plus
    /// every listed auditor, once each. Returns the number of mails sent;
    /// failures are logged and counted out.
    pub async fn send_initial_notifications(
        &self,
        plan: &AuditPlan,
        auditor_ids: &[i64],
        location_ids: &[i64],
    ) -> AuditResult<usize> {
        let store = &self.ctx.store;
        let location_names: Vec<String> = store
            .find_locations(location_ids)
            .await?
            .into_iter()
            .map(|l| l.name)
            .collect();

        let auditors: BTreeSet<i64> = auditor_ids.iter().copied().collect();
        let mut recipients: BTreeSet<i64> = store
            .assets_in_locations(&location_names)
            .await?
            .into_iter()
            .filter_map(|a| a.user_id)
            .collect();
        recipients.extend(auditors.iter().copied());

        let ids: Vec<i64> = recipients.into_iter().collect();
        let employees = store.find_employees(&ids).await?;

        let mut sent = 0;
        for employee in employees {
            let is_auditor = auditors.contains(&employee.id);
            let portal_url = self.portal_url(employee.id, plan.id).await;
            let data = MailData::AuditKickoff {
                plan_name: plan.name.clone(),
                start_date: plan.start_date,
                due_date: plan.due_date,
                is_auditor,
                portal_url,
            };
            if self.deliver(&employee, MailTemplate::AuditKickoff, data).await {
                sent += 1;
            }
        }

        info!(
            audit_plan_id = plan.id,
            recipients = ids.len(),
            sent,
            "Audit kickoff notifications dispatched"
        );
        Ok(sent)
    }

    /// Reminds owners of unaudited assets in every active plan whose due
    /// date is exactly one of the configured day offsets away.
    pub async fn send_reminders(&self) -> AuditResult<ReminderSummary> {
        let today = self.ctx.clock.today();
        let plans = self.ctx.store.active_audit_plans().await?;
        let mut summary = ReminderSummary {
            plans_checked: plans.len(),
            ..ReminderSummary::default()
        };

        for plan in plans {
            let days_remaining = plan.days_until_due(today);
            if !self.ctx.settings.reminder_days.contains(&days_remaining) {
                debug!(audit_plan_id = plan.id, days_remaining, "No reminder due");
                continue;
            }
            summary.plans_due += 1;

            let outstanding = self.outstanding_by_owner(plan.id).await?;
            let ids: Vec<i64> = outstanding.keys().copied().collect();
            for employee in self.ctx.store.find_employees(&ids).await? {
                let outstanding_assets = outstanding.get(&employee.id).copied().unwrap_or(0);
                let portal_url = self.portal_url(employee.id, plan.id).await;
                let data = MailData::AuditReminder {
                    plan_name: plan.name.clone(),
                    due_date: plan.due_date,
                    days_remaining,
                    outstanding_assets,
                    portal_url,
                };
                if self.deliver(&employee, MailTemplate::AuditReminder, data).await {
                    summary.reminders_sent += 1;
                } else {
                    summary.failed += 1;
                }
            }
            info!(
                audit_plan_id = plan.id,
                days_remaining,
                employees = ids.len(),
                "Audit reminders dispatched"
            );
        }

        Ok(summary)
    }

    /// Unaudited asset counts keyed by the canonical asset's owner.
    async fn outstanding_by_owner(&self, audit_plan_id: i64) -> AuditResult<BTreeMap<i64, usize>> {
        let asset_ids: Vec<i64> = self
            .ctx
            .store
            .audit_assets_for_plan(audit_plan_id)
            .await?
            .into_iter()
            .filter(|a| !a.is_audited())
            .map(|a| a.asset_id)
            .collect();

        let mut counts = BTreeMap::new();
        for asset in self.ctx.store.find_assets(&asset_ids).await? {
            if let Some(owner) = asset.user_id {
                *counts.entry(owner).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    /// Portal link with a new token. A failure to mint leaves the link out
    /// rather than dropping the mail.
    async fn portal_url(&self, employee_id: i64, audit_plan_id: i64) -> Option<String> {
        match self.access.mint(employee_id, audit_plan_id).await {
            Ok(issued) => self.ctx.settings.portal_url(&issued.token),
            Err(e) => {
                warn!(employee_id, audit_plan_id, error = %e, "Failed to issue portal token");
                None
            }
        }
    }

    async fn deliver(&self, employee: &Employee, template: MailTemplate, data: MailData) -> bool {
        let Some(address) = employee.mail_address() else {
            warn!(employee_id = employee.id, %template, "Recipient has no email address on file");
            return false;
        };
        let mail = OutboundMail {
            to: address.to_string(),
            to_name: employee.name.clone(),
            template,
            data,
        };
        match self.ctx.mailer.send(&mail).await {
            Ok(()) => {
                debug!(employee_id = employee.id, %template, "Mail sent");
                true
            }
            Err(e) => {
                warn!(employee_id = employee.id, %template, error = %e, "Failed to send mail");
                false
            }
        }
    }
}
