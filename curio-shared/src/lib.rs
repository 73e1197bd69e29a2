//! # Curio Shared Library
//!
//! This crate contains the data models, query/filter engine, and
//! authentication utilities used by the Curio API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and owner-scoped store operations
//! - `filter`: Request filter parsing and deduplication helpers
//! - `auth`: Password hashing and JWT token utilities
//! - `db`: Connection pooling, migrations, and startup readiness wait
//! - `storage`: Image payload validation and file storage

pub mod auth;
pub mod db;
pub mod filter;
pub mod models;
pub mod storage;

/// Current version of the Curio shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
