//! Collaborators and tunables shared by every audit service.

use chrono::Duration;
use std::sync::Arc;

use super::access::TokenCache;
use super::clock::Clock;
use super::notification::MailTransport;
use crate::store::AuditStore;

/// Workflow tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditSettings {
    /// Lifetime of a portal access token.
    pub access_token_ttl: Duration,
    /// Grant portal access to any employee while a plan has no assignments.
    pub allow_access_without_assignments: bool,
    /// Exact days-before-due on which audit reminders go out.
    pub reminder_days: Vec<i64>,
    /// Default due offset for new corrective actions.
    pub corrective_action_due_days: i64,
    /// Portal base URL used to build links in mails. No links when unset.
    pub portal_base_url: Option<String>,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::days(7),
            allow_access_without_assignments: false,
            reminder_days: vec![7, 3, 1],
            corrective_action_due_days: 7,
            portal_base_url: None,
        }
    }
}

impl AuditSettings {
    /// Portal link carrying `token`, if a base URL is configured.
    pub fn portal_url(&self, token: &str) -> Option<String> {
        self.portal_base_url
            .as_deref()
            .map(|base| format!("{}/audit/portal?token={}", base.trim_end_matches('/'), token))
    }
}

/// Handles to the out-of-process collaborators.
#[derive(Clone)]
pub struct AuditContext {
    pub store: Arc<dyn AuditStore>,
    pub mailer: Arc<dyn MailTransport>,
    pub tokens: Arc<dyn TokenCache>,
    pub clock: Arc<dyn Clock>,
    pub settings: AuditSettings,
}

impl std::fmt::Debug for AuditContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
