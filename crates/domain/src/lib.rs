//! Domain layer for the asset audit backend.
//!
//! This crate contains:
//! - Domain models (Asset, Audit Plan, Audit Asset, Corrective Action)
//! - The collaborator traits (store, mail transport, token cache, clock)
//!   with in-memory implementations
//! - Business logic services
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;
pub mod store;

#[cfg(test)]
mod test_support;

pub use error::{AuditError, AuditResult};
