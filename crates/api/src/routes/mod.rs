//! HTTP route handlers.

pub mod audit_assets;
pub mod audit_plans;
pub mod corrective_actions;
pub mod health;
pub mod portal;
pub mod reminders;
