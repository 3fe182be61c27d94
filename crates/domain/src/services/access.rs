//! Employee portal access tokens and plan access checks.

use async_trait::async_trait;
use chrono::Duration;
use shared::crypto::{generate_access_token, token_fingerprint};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::context::AuditContext;
use crate::error::{AuditError, AuditResult};
use crate::models::access::access_cache_key;
use crate::models::{AccessGrant, AuditPlan};
use crate::store::StoreResult;

/// TTL cache holding portal grants.
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn put(&self, key: &str, grant: AccessGrant, ttl: Duration) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<AccessGrant>>;

    async fn forget(&self, key: &str) -> StoreResult<()>;
}

/// Process-local token cache. Entries are evicted lazily on read once their
/// TTL has elapsed on the monotonic clock.
#[derive(Debug, Default)]
pub struct InMemoryTokenCache {
    entries: Mutex<HashMap<String, (AccessGrant, Instant)>>,
}

impl InMemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn put(&self, key: &str, grant: AccessGrant, ttl: Duration) -> StoreResult<()> {
        let ttl = ttl.to_std().unwrap_or_default();
        let evict_at = Instant::now() + ttl;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (grant, evict_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<AccessGrant>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, evict_at)) if Instant::now() >= *evict_at => {
                entries.remove(key);
                Ok(None)
            }
            Some((grant, _)) => Ok(Some(*grant)),
            None => Ok(None),
        }
    }

    async fn forget(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// A freshly minted token and what it grants.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub grant: AccessGrant,
}

/// Issues, resolves and revokes portal tokens.
#[derive(Debug, Clone)]
pub struct AccessService {
    ctx: AuditContext,
}

impl AccessService {
    pub fn new(ctx: AuditContext) -> Self {
        Self { ctx }
    }

    /// Issues a token after checking that the employee may act in the plan.
    pub async fn issue_token(&self, employee_id: i64, audit_plan_id: i64) -> AuditResult<IssuedToken> {
        if self.ctx.store.find_employee(employee_id).await?.is_none() {
            return Err(AuditError::not_found(format!("Employee {}", employee_id)));
        }
        let plan = self.load_plan(audit_plan_id).await?;
        if !plan.is_active() {
            return Err(AuditError::conflict(format!(
                "Audit plan {} is completed",
                audit_plan_id
            )));
        }
        if !self.check_plan_access(employee_id, audit_plan_id).await? {
            return Err(AuditError::forbidden(format!(
                "Employee {} has no access to audit plan {}",
                employee_id, audit_plan_id
            )));
        }
        self.mint(employee_id, audit_plan_id).await
    }

    /// Mints a token without access checks. Callers must already know the
    /// employee belongs to the plan.
    pub(crate) async fn mint(&self, employee_id: i64, audit_plan_id: i64) -> AuditResult<IssuedToken> {
        let token = generate_access_token();
        let ttl = self.ctx.settings.access_token_ttl;
        let grant = AccessGrant {
            employee_id,
            audit_plan_id,
            expires_at: self.ctx.clock.now() + ttl,
        };
        self.ctx
            .tokens
            .put(&access_cache_key(&token), grant, ttl)
            .await?;

        info!(
            employee_id,
            audit_plan_id,
            token = %token_fingerprint(&token),
            expires_at = %grant.expires_at,
            "Issued audit access token"
        );
        Ok(IssuedToken { token, grant })
    }

    /// Resolves a token to its grant.
    ///
    /// The grant's own expiry is checked against the clock even if the cache
    /// still holds the entry; expired entries are forgotten.
    pub async fn resolve_token(&self, token: &str) -> AuditResult<AccessGrant> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuditError::Unauthorized("Access token is required".to_string()));
        }
        let key = access_cache_key(token);
        let Some(grant) = self.ctx.tokens.get(&key).await? else {
            return Err(AuditError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        };

        if grant.is_expired(self.ctx.clock.now()) {
            warn!(
                employee_id = grant.employee_id,
                token = %token_fingerprint(token),
                "Rejected expired audit access token"
            );
            self.ctx.tokens.forget(&key).await?;
            return Err(AuditError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }
        Ok(grant)
    }

    pub async fn revoke_token(&self, token: &str) -> AuditResult<()> {
        self.ctx.tokens.forget(&access_cache_key(token.trim())).await?;
        Ok(())
    }

    /// Resolves a token and re-checks plan access for its holder.
    pub async fn authorize(&self, token: &str) -> AuditResult<AccessGrant> {
        let grant = self.resolve_token(token).await?;
        if !self
            .check_plan_access(grant.employee_id, grant.audit_plan_id)
            .await?
        {
            return Err(AuditError::forbidden(format!(
                "Employee {} has no access to audit plan {}",
                grant.employee_id, grant.audit_plan_id
            )));
        }
        Ok(grant)
    }

    /// Whether the employee is an auditor in the plan or owns an asset in it.
    ///
    /// A plan without assignments admits nobody unless
    /// `allow_access_without_assignments` is set.
    pub async fn check_plan_access(&self, employee_id: i64, audit_plan_id: i64) -> AuditResult<bool> {
        let store = &self.ctx.store;
        let assignments = store.assignments_for_plan(audit_plan_id).await?;
        if assignments.is_empty() {
            if self.ctx.settings.allow_access_without_assignments {
                warn!(
                    employee_id,
                    audit_plan_id,
                    "Granting access to plan without assignments"
                );
            }
            return Ok(self.ctx.settings.allow_access_without_assignments);
        }
        if assignments.iter().any(|a| a.auditor_id == employee_id) {
            return Ok(true);
        }

        let asset_ids: Vec<i64> = store
            .audit_assets_for_plan(audit_plan_id)
            .await?
            .iter()
            .map(|a| a.asset_id)
            .collect();
        let assets = store.find_assets(&asset_ids).await?;
        Ok(assets.iter().any(|a| a.user_id == Some(employee_id)))
    }

    async fn load_plan(&self, audit_plan_id: i64) -> AuditResult<AuditPlan> {
        self.ctx
            .store
            .find_audit_plan(audit_plan_id)
            .await?
            .ok_or_else(|| AuditError::not_found(format!("Audit plan {}", audit_plan_id)))
    }
}
