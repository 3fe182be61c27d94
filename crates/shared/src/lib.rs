//! Shared utilities for the asset audit backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (hashing, access token generation)
//! - Aggregating validation helpers

pub mod crypto;
pub mod validation;
