//! Persistence layer for the asset audit backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - [`PgAuditStore`], the PostgreSQL implementation of the domain store

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use store::PgAuditStore;
