//! Shared fixtures for service tests.

use chrono::{NaiveDate, TimeZone, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use std::sync::Arc;

use crate::models::{
    ActorType, Asset, AssetStatus, AuditAction, AuditAsset, Employee, Location, NewAuditAsset,
    NewAuditLogEntry, NewAuditPlan, NotesLog,
};
use crate::models::audit_assignment::cross_product;
use crate::services::{AuditContext, AuditSettings, FixedClock, InMemoryTokenCache, MockMailTransport};
use crate::store::{AuditPlanFanOut, AuditStore, InMemoryAuditStore};

pub const TOKYO: i64 = 1;
pub const OSAKA: i64 = 2;

pub struct Fixture {
    pub store: Arc<InMemoryAuditStore>,
    pub mailer: Arc<MockMailTransport>,
    pub tokens: Arc<InMemoryTokenCache>,
    pub clock: Arc<FixedClock>,
    pub ctx: AuditContext,
    pub auditor_id: i64,
    pub owner_id: i64,
    pub second_owner_id: i64,
    pub outsider_id: i64,
    /// Set by [`Fixture::with_plan`].
    pub plan_id: i64,
}

pub fn employee(id: i64, name: &str, email: Option<&str>) -> Employee {
    Employee {
        id,
        name: name.to_string(),
        email: email.map(str::to_string),
        department: None,
    }
}

/// Employee with a generated name and address.
pub fn generated_employee(id: i64) -> Employee {
    Employee {
        id,
        name: Name().fake(),
        email: Some(SafeEmail().fake()),
        department: None,
    }
}

pub fn asset(id: i64, location: &str, user_id: Option<i64>) -> Asset {
    Asset {
        id,
        asset_code: format!("PC-{:04}", id),
        asset_type: "Laptop".to_string(),
        location: location.to_string(),
        status: AssetStatus::InUse,
        user_id,
        notes: NotesLog::new(),
        last_updated: None,
        updated_by: None,
        updated_at: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

impl Fixture {
    /// Two locations, four employees and three assets; no plan.
    ///
    /// Tokyo HQ holds asset 100 (owned by Sato) and 101 (unassigned); Osaka
    /// Branch holds 102 (owned by Suzuki). Tanaka audits, Kato owns nothing.
    pub async fn seeded() -> Self {
        let store = Arc::new(InMemoryAuditStore::new());
        let mailer = Arc::new(MockMailTransport::new());
        let tokens = Arc::new(InMemoryTokenCache::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
        ));

        store
            .insert_location(Location { id: TOKYO, name: "Tokyo HQ".to_string() })
            .await;
        store
            .insert_location(Location { id: OSAKA, name: "Osaka Branch".to_string() })
            .await;
        store
            .insert_employee(employee(10, "Tanaka Taro", Some("tanaka@example.com")))
            .await;
        store
            .insert_employee(employee(20, "Sato Hanako", Some("sato@example.com")))
            .await;
        store
            .insert_employee(employee(21, "Suzuki Ichiro", Some("suzuki@example.com")))
            .await;
        store
            .insert_employee(employee(30, "Kato Ken", Some("kato@example.com")))
            .await;
        store.insert_asset(asset(100, "Tokyo HQ", Some(20))).await;
        store.insert_asset(asset(101, "Tokyo HQ", None)).await;
        store.insert_asset(asset(102, "Osaka Branch", Some(21))).await;

        let ctx = AuditContext {
            store: store.clone(),
            mailer: mailer.clone(),
            tokens: tokens.clone(),
            clock: clock.clone(),
            settings: AuditSettings {
                portal_base_url: Some("https://assets.example.com".to_string()),
                ..AuditSettings::default()
            },
        };

        Self {
            store,
            mailer,
            tokens,
            clock,
            ctx,
            auditor_id: 10,
            owner_id: 20,
            second_owner_id: 21,
            outsider_id: 30,
            plan_id: 0,
        }
    }

    /// Seeded fixture plus a plan over Tokyo HQ audited by Tanaka, written
    /// straight to the store.
    pub async fn with_plan() -> Self {
        let mut fx = Self::seeded().await;
        let owner = fx.store.find_employee(20).await.unwrap().map(|e| e.name);
        let a100 = fx.store.find_asset(100).await.unwrap().unwrap();
        let a101 = fx.store.find_asset(101).await.unwrap().unwrap();

        fx.plan_id = fx
            .create_plan(
                cross_product(&[TOKYO], &[10]),
                vec![
                    NewAuditAsset::snapshot(&a100, owner),
                    NewAuditAsset::snapshot(&a101, None),
                ],
            )
            .await;
        fx
    }

    /// A plan with no assignments and no assets.
    pub async fn bare_plan(&self) -> i64 {
        self.create_plan(vec![], vec![]).await
    }

    async fn create_plan(
        &self,
        assignments: Vec<crate::models::NewAuditAssignment>,
        snapshots: Vec<NewAuditAsset>,
    ) -> i64 {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let created = self
            .store
            .create_audit_plan(AuditPlanFanOut {
                plan: NewAuditPlan {
                    name: "Q1 Audit".to_string(),
                    description: None,
                    start_date: date(2025, 1, 1),
                    due_date: date(2025, 2, 1),
                    created_by: None,
                    created_at: now,
                },
                assignments,
                snapshots,
                log: NewAuditLogEntry {
                    action: AuditAction::AuditPlanCreate,
                    actor_type: ActorType::System,
                    actor_id: None,
                    resource_type: "audit_plan".to_string(),
                    resource_id: None,
                    summary: "fixture".to_string(),
                    changes: None,
                    created_at: now,
                },
            })
            .await
            .unwrap();
        created.plan.id
    }

    /// The plan's audit asset for a canonical asset id.
    pub async fn audit_asset_for(&self, asset_id: i64) -> AuditAsset {
        self.store
            .audit_assets_for_plan(self.plan_id)
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.asset_id == asset_id)
            .unwrap()
    }
}
