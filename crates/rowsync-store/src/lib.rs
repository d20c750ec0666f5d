//! rowsync Store - Local store interfaces
//!
//! The reconciliation engine reads the local store through point lookups and
//! hands its output back as one atomic batch:
//! - `SnapshotSource`: identity -> last update clock + locally-owned fields
//! - `BatchSink`: all-or-nothing batch apply
//! - `MemoryStore`: in-process implementation of both

pub mod traits;
pub mod memory;

pub use traits::*;
pub use memory::*;
