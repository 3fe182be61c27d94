//! Outbound mail abstraction.
//!
//! The workflow hands a typed [`OutboundMail`] to a [`MailTransport`] and
//! learns synchronously whether the send succeeded. Rendering subjects and
//! bodies is the transport's business.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

use crate::models::{ActionPriority, ActionStatus, CorrectiveAction};

/// Template kind of an outbound mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTemplate {
    AuditKickoff,
    AuditReminder,
    CorrectiveActionAssigned,
    CorrectiveActionReminder,
    CorrectiveActionOverdue,
}

impl std::fmt::Display for MailTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MailTemplate::AuditKickoff => "audit_kickoff",
            MailTemplate::AuditReminder => "audit_reminder",
            MailTemplate::CorrectiveActionAssigned => "corrective_action_assigned",
            MailTemplate::CorrectiveActionReminder => "corrective_action_reminder",
            MailTemplate::CorrectiveActionOverdue => "corrective_action_overdue",
        };
        write!(f, "{}", s)
    }
}

/// One corrective action line inside a mail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSummary {
    pub id: i64,
    pub audit_plan_id: i64,
    pub issue: String,
    pub action: String,
    pub priority: ActionPriority,
    pub status: ActionStatus,
    pub due_date: NaiveDate,
}

impl From<&CorrectiveAction> for ActionSummary {
    fn from(action: &CorrectiveAction) -> Self {
        Self {
            id: action.id,
            audit_plan_id: action.audit_plan_id,
            issue: action.issue.clone(),
            action: action.action.clone(),
            priority: action.priority,
            status: action.status,
            due_date: action.due_date,
        }
    }
}

/// Template data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MailData {
    AuditKickoff {
        plan_name: String,
        start_date: NaiveDate,
        due_date: NaiveDate,
        is_auditor: bool,
        portal_url: Option<String>,
    },
    AuditReminder {
        plan_name: String,
        due_date: NaiveDate,
        days_remaining: i64,
        outstanding_assets: usize,
        portal_url: Option<String>,
    },
    /// One or more actions for a single recipient, in the order given.
    CorrectiveActions { actions: Vec<ActionSummary> },
}

/// A fully addressed mail ready for the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMail {
    pub to: String,
    pub to_name: String,
    pub template: MailTemplate,
    pub data: MailData,
}

impl OutboundMail {
    /// Number of corrective actions carried, 0 for audit mails.
    pub fn action_count(&self) -> usize {
        match &self.data {
            MailData::CorrectiveActions { actions } => actions.len(),
            _ => 0,
        }
    }
}

/// Transport failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailError {
    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("Mail transport disabled")]
    Disabled,

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Outbound mail transport.
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError>;
}

/// Mock transport for development and testing.
///
/// Records every mail it accepts. Sends to addresses registered with
/// [`MockMailTransport::fail_for`] fail, as does every send when
/// `simulate_failure` is set.
#[derive(Debug, Default)]
pub struct MockMailTransport {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    failing: Mutex<HashSet<String>>,
    sent: Mutex<Vec<OutboundMail>>,
}

impl MockMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock transport that fails every send.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Make sends to `address` fail from now on.
    pub fn fail_for(&self, address: impl Into<String>) {
        let mut failing = match self.failing.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        failing.insert(address.into());
    }

    /// Every mail accepted so far.
    pub fn sent(&self) -> Vec<OutboundMail> {
        match self.sent.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn sent_to(&self, address: &str) -> Vec<OutboundMail> {
        self.sent().into_iter().filter(|m| m.to == address).collect()
    }

    fn should_fail(&self, address: &str) -> bool {
        if self.simulate_failure {
            return true;
        }
        match self.failing.lock() {
            Ok(guard) => guard.contains(address),
            Err(poisoned) => poisoned.into_inner().contains(address),
        }
    }
}

#[async_trait::async_trait]
impl MailTransport for MockMailTransport {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        if self.should_fail(&mail.to) {
            tracing::warn!(
                to = %mail.to,
                template = %mail.template,
                "Mock mail transport simulating failure"
            );
            return Err(MailError::SendFailed("Simulated failure".to_string()));
        }

        tracing::info!(
            to = %mail.to,
            template = %mail.template,
            actions = mail.action_count(),
            "Mock: Would send mail"
        );

        let mut sent = match self.sent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sent.push(mail.clone());
        Ok(())
    }
}
