//! rowsync Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every stage of a reconciliation pass:
//! - Identifiers (EntityKind, RecordId) and identity derivation
//! - Logical clock values (Timestamp)
//! - Feed entries and field maps
//! - Local snapshots, mutations and batches

pub mod id;
pub mod identity;
pub mod time;
pub mod entry;
pub mod snapshot;
pub mod mutation;
pub mod error;

pub use id::*;
pub use identity::*;
pub use time::*;
pub use entry::*;
pub use snapshot::*;
pub use mutation::*;
pub use error::*;

/// Store column holding a record's last remote update
pub const UPDATED_FIELD: &str = "updated";
