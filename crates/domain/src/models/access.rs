//! Employee portal access tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit_asset::StatusUpdateRequest;

/// Cache key prefix for portal access tokens.
pub const ACCESS_KEY_PREFIX: &str = "employee_audit_access:";

/// Builds the token cache key for a raw token.
pub fn access_cache_key(token: &str) -> String {
    format!("{}{}", ACCESS_KEY_PREFIX, token)
}

/// What a portal access token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub employee_id: i64,
    pub audit_plan_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl AccessGrant {
    /// Expiry is authoritative even when the cache still holds the entry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Request payload for issuing a portal token.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueAccessTokenRequest {
    pub employee_id: i64,
    pub audit_plan_id: i64,
}

/// Response for a freshly issued portal token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub token: String,
    pub employee_id: i64,
    pub audit_plan_id: i64,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portal_url: Option<String>,
}

/// Employee access flow payload: `{token}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalAccessRequest {
    pub token: String,
}

/// Status submission made through the portal.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalStatusUpdate {
    pub token: String,
    #[serde(flatten)]
    pub update: StatusUpdateRequest,
}
