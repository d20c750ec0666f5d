//! rowsync Sync - Delta reconciliation of a remote feed against a local store
//!
//! This crate implements the reconciliation pass:
//! - Per-kind policy tables (identity rule, column mappings, derived fields, owned fields)
//! - Injected configuration (alias table, asset base URL)
//! - Conflict resolution against store snapshots
//! - Field mapping with owned-field inheritance
//! - The pass driver, producing one atomic batch per pass
//! - Per-kind pass exclusion

pub mod config;
pub mod policy;
pub mod resolve;
pub mod mapper;
pub mod engine;
pub mod guard;

pub use config::*;
pub use policy::*;
pub use resolve::*;
pub use mapper::*;
pub use engine::*;
pub use guard::*;
