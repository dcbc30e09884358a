#![forbid(unsafe_code)]
//! Persistence boundary for the nerve center.
//!
//! One [`Store`] contract, two implementations: [`SqliteStore`] is the shared
//! relational store (hosted mode, safe across processes), [`LocalStore`] is a
//! single JSON state file owned by one process (local mode). External
//! behavior is identical; only cross-process visibility differs.

mod store;

pub use store::error::StoreError;
pub use store::local::LocalStore;
pub use store::sqlite::SqliteStore;
pub use store::types::*;
pub use store::{Store, ms_to_rfc3339, now_ms, now_rfc3339};
