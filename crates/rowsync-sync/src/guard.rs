//! Per-kind pass exclusion
//!
//! Snapshot reads are not isolated from the write-back of a concurrent pass
//! over the same kind, so at most one pass per kind may be in flight. Passes
//! over different kinds touch disjoint partitions and may overlap.

use std::collections::HashSet;

use parking_lot::Mutex;
use rowsync_core::{EntityKind, SyncError, SyncResult};

#[derive(Debug, Default)]
pub struct KindLocks {
    in_flight: Mutex<HashSet<EntityKind>>,
}

impl KindLocks {
    pub fn new() -> Self {
        KindLocks::default()
    }

    /// Claim `kind`; fails with `PassInFlight` if another pass holds it
    pub fn acquire(&self, kind: &EntityKind) -> SyncResult<PassGuard<'_>> {
        if !self.in_flight.lock().insert(kind.clone()) {
            return Err(SyncError::PassInFlight(kind.clone()));
        }
        Ok(PassGuard {
            locks: self,
            kind: kind.clone(),
        })
    }

    pub fn is_held(&self, kind: &EntityKind) -> bool {
        self.in_flight.lock().contains(kind)
    }
}

/// Held for the duration of one pass; releases the kind on drop
#[derive(Debug)]
pub struct PassGuard<'a> {
    locks: &'a KindLocks,
    kind: EntityKind,
}

impl PassGuard<'_> {
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.locks.in_flight.lock().remove(&self.kind);
    }
}
