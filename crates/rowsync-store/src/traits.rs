//! Store collaborator interfaces

use std::sync::Arc;

use rowsync_core::{Batch, EntityKind, LocalSnapshot, RecordId, StoreError};

/// Read side: per-identity snapshot lookups
pub trait SnapshotSource {
    /// Project `updated` plus the named owned fields of one record.
    ///
    /// A missing record is not an error: it yields [`LocalSnapshot::absent`].
    fn snapshot(
        &self,
        kind: &EntityKind,
        id: &RecordId,
        owned_fields: &[String],
    ) -> Result<LocalSnapshot, StoreError>;
}

/// Write side: atomic batch apply
pub trait BatchSink {
    /// Apply every mutation of `batch` or none of them
    fn apply_batch(&self, batch: &Batch) -> Result<(), StoreError>;
}

/// Both sides of a store
pub trait Store: SnapshotSource + BatchSink {}

impl<T: SnapshotSource + BatchSink + ?Sized> Store for T {}

impl<T: SnapshotSource + ?Sized> SnapshotSource for &T {
    fn snapshot(
        &self,
        kind: &EntityKind,
        id: &RecordId,
        owned_fields: &[String],
    ) -> Result<LocalSnapshot, StoreError> {
        (**self).snapshot(kind, id, owned_fields)
    }
}

impl<T: SnapshotSource + ?Sized> SnapshotSource for Arc<T> {
    fn snapshot(
        &self,
        kind: &EntityKind,
        id: &RecordId,
        owned_fields: &[String],
    ) -> Result<LocalSnapshot, StoreError> {
        (**self).snapshot(kind, id, owned_fields)
    }
}

impl<T: BatchSink + ?Sized> BatchSink for &T {
    fn apply_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        (**self).apply_batch(batch)
    }
}

impl<T: BatchSink + ?Sized> BatchSink for Arc<T> {
    fn apply_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        (**self).apply_batch(batch)
    }
}
