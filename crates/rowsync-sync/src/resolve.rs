//! Conflict resolution
//!
//! An incoming row supersedes the local record only when its clock is
//! strictly newer. Equal clocks are "no change", which is what makes a
//! re-run over an unchanged feed produce an empty batch.

use rowsync_core::{FieldMap, LocalSnapshot, RecordId, StoreError, Timestamp};
use rowsync_store::SnapshotSource;
use tracing::debug;

use crate::KindPolicy;

/// Outcome for one incoming row
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Local record is as new or newer; emit nothing
    Skip,
    /// Overwrite, carrying these owned fields into the new record
    Supersede(FieldMap),
}

impl Resolution {
    pub fn is_skip(&self) -> bool {
        matches!(self, Resolution::Skip)
    }
}

/// Pure supersede rule
pub fn decide(incoming: Timestamp, snapshot: LocalSnapshot) -> Resolution {
    if incoming.supersedes(snapshot.last_updated) {
        Resolution::Supersede(snapshot.owned)
    } else {
        Resolution::Skip
    }
}

/// Resolves rows of one kind against a store
pub struct ConflictResolver<'a, S: ?Sized> {
    store: &'a S,
    policy: &'a KindPolicy,
}

impl<'a, S: SnapshotSource + ?Sized> ConflictResolver<'a, S> {
    pub fn new(store: &'a S, policy: &'a KindPolicy) -> Self {
        ConflictResolver { store, policy }
    }

    /// Resolve one row.
    ///
    /// `pending` is the clock of an upsert for `id` already queued earlier
    /// in this pass; the row must beat it as well as the stored record.
    /// Owned fields always come from the store.
    pub fn resolve(
        &self,
        id: &RecordId,
        incoming: Timestamp,
        pending: Option<Timestamp>,
    ) -> Result<Resolution, StoreError> {
        let mut snapshot = self
            .store
            .snapshot(&self.policy.kind, id, &self.policy.owned_fields)?;

        debug!(
            %id,
            local = %snapshot.last_updated,
            server = %incoming,
            pending = ?pending,
            "resolving entry"
        );

        if let Some(pending) = pending {
            snapshot.last_updated = snapshot.last_updated.max(pending);
        }
        Ok(decide(incoming, snapshot))
    }
}
