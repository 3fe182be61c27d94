use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

use domain::services::AuditSettings;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub email: EmailConfig,
    pub audit: AuditConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

/// Audit store connection settings. `url` has no usable default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 20,
            min_connections: 5,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        }
    }
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

/// `format` is `json`, `compact` or `pretty`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Allowed CORS origins; empty allows any.
    pub cors_origins: Vec<String>,
}

/// Outbound mail for kickoff, reminder and corrective action notices.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,

    /// `console`, `smtp` or `sendgrid`
    pub provider: String,

    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,

    /// STARTTLS when true, plaintext relay otherwise (local relays only)
    pub smtp_use_tls: bool,

    pub sendgrid_api_key: String,

    pub sender_email: String,
    pub sender_name: String,

    /// Portal base URL for links in mail, e.g. https://assets.example.com
    pub base_url: String,

    /// `html` adds an HTML part next to the plain text
    pub template_style: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "console".to_string(),
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_use_tls: true,
            sendgrid_api_key: String::new(),
            sender_email: "noreply@asset-audit.local".to_string(),
            sender_name: "Asset Audit".to_string(),
            base_url: String::new(),
            template_style: "html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Portal access token lifetime in seconds
    pub access_token_ttl_secs: i64,

    /// Admit any employee to plans that have no assignments
    pub allow_access_without_assignments: bool,

    /// Days before a plan's due date on which reminders go out
    pub reminder_days: Vec<i64>,

    /// Due offset for new corrective actions
    pub corrective_action_due_days: i64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: 7 * 24 * 3600,
            allow_access_without_assignments: false,
            reminder_days: vec![7, 3, 1],
            corrective_action_due_days: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub enabled: bool,

    /// Audit reminder sweep: hourly, daily or weekly
    pub reminder_frequency: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reminder_frequency: "daily".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Reads `config/default`, the optional `config/local`, then
    /// `AUDIT__SECTION__KEY` environment variables, and validates the result.
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("AUDIT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("audit.reminder_days")
                    .with_list_parse_key("security.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Struct defaults plus `overrides`, with mail and jobs off. Not validated.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("email.enabled", false)?
            .set_default("jobs.enabled", false)?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        builder.build()?.try_deserialize()
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        use ConfigValidationError::{InvalidValue, MissingRequired};

        if self.database.url.trim().is_empty() {
            return Err(MissingRequired(
                "database.url (AUDIT__DATABASE__URL) must be set".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(InvalidValue("server.port cannot be 0".to_string()));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(InvalidValue(
                "database.min_connections cannot exceed max_connections".to_string(),
            ));
        }
        if self.audit.access_token_ttl_secs <= 0 {
            return Err(InvalidValue(
                "audit.access_token_ttl_secs must be positive".to_string(),
            ));
        }
        if self.audit.reminder_days.iter().any(|d| *d <= 0) {
            return Err(InvalidValue(
                "audit.reminder_days must all be positive".to_string(),
            ));
        }
        if self.audit.corrective_action_due_days <= 0 {
            return Err(InvalidValue(
                "audit.corrective_action_due_days must be positive".to_string(),
            ));
        }

        if self.email.enabled {
            match self.email.provider.as_str() {
                "console" => {}
                "smtp" if self.email.smtp_host.is_empty() => {
                    return Err(MissingRequired(
                        "email.smtp_host is required for the smtp provider".to_string(),
                    ));
                }
                "sendgrid" if self.email.sendgrid_api_key.is_empty() => {
                    return Err(MissingRequired(
                        "email.sendgrid_api_key is required for the sendgrid provider".to_string(),
                    ));
                }
                "smtp" | "sendgrid" => {}
                other => return Err(InvalidValue(format!("Unknown email provider: {}", other))),
            }
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    /// Workflow settings handed to the domain services.
    pub fn audit_settings(&self) -> AuditSettings {
        let base_url = self.email.base_url.trim();
        AuditSettings {
            access_token_ttl: chrono::Duration::seconds(self.audit.access_token_ttl_secs),
            allow_access_without_assignments: self.audit.allow_access_without_assignments,
            reminder_days: self.audit.reminder_days.clone(),
            corrective_action_due_days: self.audit.corrective_action_due_days,
            portal_base_url: (!base_url.is_empty()).then(|| base_url.to_string()),
        }
    }
}
