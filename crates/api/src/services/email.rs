//! Email transport for audit and corrective action mail.
//!
//! Supports multiple email providers:
//! - `console`: Logs emails to console (development)
//! - `smtp`: Sends via SMTP with `lettre`
//! - `sendgrid`: Uses the SendGrid v3 API

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use domain::services::{ActionSummary, MailData, MailError, MailTemplate, MailTransport, OutboundMail};

use crate::config::EmailConfig;
use crate::middleware::metrics::record_mail_sent;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured: {0}")]
    NotConfigured(String),

    #[error("Email service disabled")]
    Disabled,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl From<EmailError> for MailError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::Disabled => MailError::Disabled,
            EmailError::InvalidAddress(addr) => MailError::InvalidAddress(addr),
            other => MailError::SendFailed(other.to_string()),
        }
    }
}

/// Rendered email message.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

/// Email service for sending workflow mail.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    smtp: Option<AsyncSmtpTransport<Tokio1Executor>>,
    http: reqwest::Client,
}

impl EmailService {
    /// Creates the service. The SMTP transport is built once up front.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let smtp = if config.enabled && config.provider == "smtp" {
            Some(build_smtp_transport(&config)?)
        } else {
            None
        };
        Ok(Self {
            config: Arc::new(config),
            smtp,
            http: reqwest::Client::new(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send an email message.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Err(EmailError::Disabled);
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message).await,
            "smtp" => self.send_smtp(message).await,
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured(format!("unknown provider {}", provider)))
            }
        }
    }

    /// Renders an outbound workflow mail into subject and bodies.
    pub fn render(&self, mail: &OutboundMail) -> EmailMessage {
        let subject = subject_for(mail);
        let body_text = text_body(mail);
        let body_html = (self.config.template_style == "html").then(|| html_body(&subject, &body_text));
        EmailMessage {
            to: mail.to.clone(),
            to_name: Some(mail.to_name.clone()).filter(|n| !n.is_empty()),
            subject,
            body_text,
            body_html,
        }
    }

    /// Console provider - logs email to console (for development).
    async fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            "Email (console provider)"
        );
        debug!(body_text = %message.body_text, "Email body (plain text)");
        Ok(())
    }

    /// SMTP provider - sends through the configured relay.
    async fn send_smtp(&self, message: EmailMessage) -> Result<(), EmailError> {
        let transport = self
            .smtp
            .as_ref()
            .ok_or_else(|| EmailError::NotConfigured("smtp transport".into()))?;

        let from = Mailbox::new(
            Some(self.config.sender_name.clone()),
            self.config
                .sender_email
                .parse()
                .map_err(|_| EmailError::InvalidAddress(self.config.sender_email.clone()))?,
        );
        let to = Mailbox::new(
            message.to_name.clone(),
            message
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(message.to.clone()))?,
        );

        let builder = Message::builder().from(from).to(to).subject(&message.subject);
        let email = match &message.body_html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                message.body_text.clone(),
                html.clone(),
            )),
            None => builder.singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(message.body_text.clone()),
            ),
        }
        .map_err(|e| EmailError::SendFailed(format!("Failed to build message: {}", e)))?;

        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendFailed(format!("SMTP send failed: {}", e)))?;

        info!(to = %message.to, subject = %message.subject, "Email sent via SMTP");
        Ok(())
    }

    /// SendGrid provider - sends via SendGrid API.
    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured("sendgrid_api_key".into()));
        }

        let mut recipient = serde_json::json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            recipient["name"] = serde_json::json!(name);
        }

        let mut content = vec![serde_json::json!({
            "type": "text/plain",
            "value": message.body_text
        })];
        if let Some(html) = &message.body_html {
            content.push(serde_json::json!({ "type": "text/html", "value": html }));
        }

        let body = serde_json::json!({
            "personalizations": [{ "to": [recipient] }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": content
        });

        let response = self
            .http
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(to = %message.to, subject = %message.subject, "Email sent via SendGrid");
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[async_trait]
impl MailTransport for EmailService {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        let result = EmailService::send(self, self.render(mail)).await;
        record_mail_sent(&mail.template.to_string(), result.is_ok());
        result.map_err(MailError::from)
    }
}

fn build_smtp_transport(
    config: &EmailConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
    if config.smtp_host.is_empty() {
        return Err(EmailError::NotConfigured("smtp_host".into()));
    }
    let builder = if config.smtp_use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| EmailError::NotConfigured(format!("SMTP relay: {}", e)))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
    };
    let mut builder = builder.port(config.smtp_port);
    if !config.smtp_username.is_empty() {
        builder = builder.credentials(Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        ));
    }
    Ok(builder.build())
}

fn subject_for(mail: &OutboundMail) -> String {
    match (&mail.template, &mail.data) {
        (_, MailData::AuditKickoff { plan_name, .. }) => format!("Asset audit started: {}", plan_name),
        (_, MailData::AuditReminder { plan_name, days_remaining, .. }) => format!(
            "Reminder: asset audit {} is due in {} day{}",
            plan_name,
            days_remaining,
            if *days_remaining == 1 { "" } else { "s" }
        ),
        (MailTemplate::CorrectiveActionOverdue, MailData::CorrectiveActions { actions }) => {
            format!("{} overdue corrective action(s)", actions.len())
        }
        (MailTemplate::CorrectiveActionReminder, MailData::CorrectiveActions { actions }) => {
            format!("Reminder: {} open corrective action(s)", actions.len())
        }
        (_, MailData::CorrectiveActions { actions }) if actions.len() == 1 => {
            "Corrective action assigned to you".to_string()
        }
        (_, MailData::CorrectiveActions { actions }) => {
            format!("{} corrective actions assigned to you", actions.len())
        }
    }
}

fn text_body(mail: &OutboundMail) -> String {
    let mut body = format!("Hi {},\n\n", mail.to_name);
    match &mail.data {
        MailData::AuditKickoff {
            plan_name,
            start_date,
            due_date,
            is_auditor,
            portal_url,
        } => {
            let _ = writeln!(
                body,
                "The asset audit \"{}\" runs from {} to {}.",
                plan_name, start_date, due_date
            );
            if *is_auditor {
                body.push_str("You are an auditor for this plan. Please check every asset at your assigned locations.\n");
            } else {
                body.push_str("Please confirm the status of the assets assigned to you.\n");
            }
            push_link(&mut body, portal_url.as_deref());
        }
        MailData::AuditReminder {
            plan_name,
            due_date,
            days_remaining,
            outstanding_assets,
            portal_url,
        } => {
            let _ = writeln!(
                body,
                "The asset audit \"{}\" is due on {} ({} day(s) left). {} of your assets still need a status.",
                plan_name, due_date, days_remaining, outstanding_assets
            );
            push_link(&mut body, portal_url.as_deref());
        }
        MailData::CorrectiveActions { actions } => {
            body.push_str("The following corrective actions need your attention:\n\n");
            for action in actions {
                push_action(&mut body, action);
            }
        }
    }
    body.push_str("\nAsset Audit");
    body
}

fn push_link(body: &mut String, url: Option<&str>) {
    if let Some(url) = url {
        let _ = writeln!(body, "\nOpen the audit portal: {}", url);
    }
}

fn push_action(body: &mut String, action: &ActionSummary) {
    let _ = writeln!(
        body,
        "- #{} [{} / {}] due {}\n  Issue: {}\n  Action: {}",
        action.id, action.priority, action.status, action.due_date, action.issue, action.action
    );
}

fn html_body(subject: &str, text: &str) -> String {
    let paragraphs: String = text
        .split("\n\n")
        .map(|p| format!("<p>{}</p>", escape_html(p).replace('\n', "<br>")))
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
{paragraphs}
</body>
</html>"#,
        title = escape_html(subject),
        paragraphs = paragraphs
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain::models::{ActionPriority, ActionStatus};

    fn test_config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            provider: "console".to_string(),
            sender_email: "test@example.com".to_string(),
            sender_name: "Test".to_string(),
            base_url: "https://assets.example.com".to_string(),
            template_style: "html".to_string(),
            ..EmailConfig::default()
        }
    }

    fn action(id: i64) -> ActionSummary {
        ActionSummary {
            id,
            audit_plan_id: 1,
            issue: "Laptop <missing>".to_string(),
            action: "Locate or report loss".to_string(),
            priority: ActionPriority::High,
            status: ActionStatus::Pending,
            due_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        }
    }

    fn actions_mail(template: MailTemplate, count: i64) -> OutboundMail {
        OutboundMail {
            to: "user@example.com".to_string(),
            to_name: "Sato Hanako".to_string(),
            template,
            data: MailData::CorrectiveActions {
                actions: (1..=count).map(action).collect(),
            },
        }
    }

    #[test]
    fn test_email_service_creation() {
        let service = EmailService::new(test_config()).unwrap();
        assert!(service.is_enabled());
    }

    #[test]
    fn test_smtp_requires_host() {
        let mut config = test_config();
        config.provider = "smtp".to_string();
        assert!(matches!(
            EmailService::new(config),
            Err(EmailError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_console_transport_sends() {
        let service = EmailService::new(test_config()).unwrap();
        let mail = actions_mail(MailTemplate::CorrectiveActionAssigned, 1);
        assert!(MailTransport::send(&service, &mail).await.is_ok());
    }

    #[test]
    fn test_disabled_transport_reports_disabled() {
        let mut config = test_config();
        config.enabled = false;
        let service = EmailService::new(config).unwrap();
        let mail = actions_mail(MailTemplate::CorrectiveActionAssigned, 1);
        let result = tokio_test::block_on(MailTransport::send(&service, &mail));
        assert_eq!(result, Err(MailError::Disabled));
    }

    #[test]
    fn test_render_greets_recipient_by_name() {
        use fake::faker::internet::en::SafeEmail;
        use fake::faker::name::en::Name;
        use fake::Fake;

        let service = EmailService::new(test_config()).unwrap();
        let name: String = Name().fake();
        let mut mail = actions_mail(MailTemplate::CorrectiveActionOverdue, 1);
        mail.to = SafeEmail().fake();
        mail.to_name = name.clone();

        let message = service.render(&mail);
        assert!(message.body_text.starts_with(&format!("Hi {},", name)));
    }

    #[test]
    fn test_render_consolidated_actions() {
        let service = EmailService::new(test_config()).unwrap();
        let message = service.render(&actions_mail(MailTemplate::CorrectiveActionAssigned, 3));

        assert_eq!(message.subject, "3 corrective actions assigned to you");
        assert!(message.body_text.starts_with("Hi Sato Hanako,"));
        assert!(message.body_text.contains("#1 [high / pending]"));
        assert!(message.body_text.contains("#3 [high / pending]"));
        let html = message.body_html.unwrap();
        assert!(html.contains("Laptop &lt;missing&gt;"));
    }

    #[test]
    fn test_render_overdue_subject() {
        let service = EmailService::new(test_config()).unwrap();
        let message = service.render(&actions_mail(MailTemplate::CorrectiveActionOverdue, 2));
        assert_eq!(message.subject, "2 overdue corrective action(s)");
    }

    #[test]
    fn test_render_kickoff_with_link() {
        let mut config = test_config();
        config.template_style = "plain".to_string();
        let service = EmailService::new(config).unwrap();
        let mail = OutboundMail {
            to: "tanaka@example.com".to_string(),
            to_name: "Tanaka Taro".to_string(),
            template: MailTemplate::AuditKickoff,
            data: MailData::AuditKickoff {
                plan_name: "FY2025 Q1".to_string(),
                start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
                due_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                is_auditor: true,
                portal_url: Some("https://assets.example.com/audit/portal?token=abc".to_string()),
            },
        };

        let message = service.render(&mail);
        assert_eq!(message.subject, "Asset audit started: FY2025 Q1");
        assert!(message.body_text.contains("You are an auditor"));
        assert!(message
            .body_text
            .contains("https://assets.example.com/audit/portal?token=abc"));
        assert!(message.body_html.is_none());
    }

    #[test]
    fn test_render_reminder_subject_singular() {
        let service = EmailService::new(test_config()).unwrap();
        let mail = OutboundMail {
            to: "sato@example.com".to_string(),
            to_name: "Sato Hanako".to_string(),
            template: MailTemplate::AuditReminder,
            data: MailData::AuditReminder {
                plan_name: "FY2025 Q1".to_string(),
                due_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                days_remaining: 1,
                outstanding_assets: 2,
                portal_url: None,
            },
        };
        assert_eq!(
            service.render(&mail).subject,
            "Reminder: asset audit FY2025 Q1 is due in 1 day"
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
    }
}
