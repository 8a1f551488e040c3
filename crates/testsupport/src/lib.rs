//! Shared test fixtures for the workspace's integration scenarios.
//!
//! This crate provides:
//! - An isolated `TestContext` wrapping a temporary-directory-backed `Database`
//! - SQL script execution with pretty-printed output for snapshot-shaped tests
//! - Row/expression builders and sample data for unit and integration tests
//! - Property-based generators for `types::Value`/`common::Row`
//! - Custom assertion helpers
//!
//! # Example Usage
//!
//! ```no_run
//! use testsupport::prelude::*;
//!
//! let mut ctx = TestContext::new().unwrap();
//! let output = ctx.run_script(r#"
//!     CREATE TABLE users (id BIGINT NOT NULL, name CHAR(32) NOT NULL);
//!     INSERT INTO users (id, name) VALUES (1, 'alice');
//!     SELECT id, name FROM users;
//! "#).unwrap();
//! ```

pub mod assertions;
pub mod context;
pub mod fixtures;
pub mod proptest_generators;
pub mod runner;

/// Convenient re-exports for common testing patterns.
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::context::*;
    pub use crate::fixtures::*;
    pub use crate::runner::*;
    pub use database::QueryResult;
}
