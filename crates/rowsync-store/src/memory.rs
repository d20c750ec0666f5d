//! In-memory store
//!
//! Records live in one partition per entity kind. Batches are staged on a
//! copy of the target partition and swapped in under the write lock, so
//! readers see either the whole batch or none of it.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use rowsync_core::{
    Batch, EntityKind, FieldMap, FieldValue, LocalSnapshot, Mutation, RecordId, StoreError,
    Timestamp, UPDATED_FIELD,
};
use tracing::debug;

use crate::{BatchSink, SnapshotSource};

type Partition = HashMap<RecordId, FieldMap>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<HashMap<EntityKind, Partition>>,
    /// Failure handed to the next `apply_batch` call
    next_apply_failure: Mutex<Option<StoreError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Seed or overwrite a record directly
    pub fn insert(&self, kind: &EntityKind, id: RecordId, fields: FieldMap) {
        self.partitions
            .write()
            .entry(kind.clone())
            .or_default()
            .insert(id, fields);
    }

    /// Change one field of an existing record, as a local user edit would.
    /// Returns `false` if the record does not exist.
    pub fn set_field(
        &self,
        kind: &EntityKind,
        id: &RecordId,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> bool {
        let mut partitions = self.partitions.write();
        match partitions.get_mut(kind).and_then(|p| p.get_mut(id)) {
            Some(record) => {
                record.insert(name.into(), value.into());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, kind: &EntityKind, id: &RecordId) -> Option<FieldMap> {
        self.partitions.read().get(kind)?.get(id).cloned()
    }

    pub fn len(&self, kind: &EntityKind) -> usize {
        self.partitions.read().get(kind).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, kind: &EntityKind) -> bool {
        self.len(kind) == 0
    }

    /// Sorted identities held for `kind`
    pub fn ids(&self, kind: &EntityKind) -> Vec<RecordId> {
        let mut ids: Vec<RecordId> = self
            .partitions
            .read()
            .get(kind)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Copy of a whole partition
    pub fn dump(&self, kind: &EntityKind) -> HashMap<RecordId, FieldMap> {
        self.partitions.read().get(kind).cloned().unwrap_or_default()
    }

    /// Make the next `apply_batch` fail with `error` without touching any record
    pub fn fail_next_apply(&self, error: StoreError) {
        *self.next_apply_failure.lock() = Some(error);
    }

    fn check_upsert(id: &RecordId, fields: &FieldMap) -> Result<(), StoreError> {
        match fields.get(UPDATED_FIELD) {
            Some(FieldValue::Integer(_)) => Ok(()),
            _ => Err(StoreError::Rejected {
                id: id.to_string(),
                reason: format!("upsert has no integer {} field", UPDATED_FIELD),
            }),
        }
    }
}

impl SnapshotSource for MemoryStore {
    fn snapshot(
        &self,
        kind: &EntityKind,
        id: &RecordId,
        owned_fields: &[String],
    ) -> Result<LocalSnapshot, StoreError> {
        // Read guard is held only for this projection
        let partitions = self.partitions.read();
        let Some(record) = partitions.get(kind).and_then(|p| p.get(id)) else {
            return Ok(LocalSnapshot::absent());
        };

        let last_updated = record
            .get(UPDATED_FIELD)
            .and_then(FieldValue::as_integer)
            .map_or(Timestamp::NEVER, Timestamp::from_millis);

        let owned = owned_fields
            .iter()
            .filter_map(|name| record.get(name).map(|v| (name.clone(), v.clone())))
            .collect();

        Ok(LocalSnapshot {
            last_updated,
            owned,
        })
    }
}

impl BatchSink for MemoryStore {
    fn apply_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        if let Some(error) = self.next_apply_failure.lock().take() {
            return Err(error);
        }
        if batch.is_empty() {
            return Ok(());
        }

        let mut partitions = self.partitions.write();
        let mut staged = partitions.get(batch.kind()).cloned().unwrap_or_default();

        for op in batch.iter() {
            match op {
                Mutation::Delete(id) => {
                    staged.remove(id);
                }
                Mutation::Upsert { id, fields } => {
                    Self::check_upsert(id, fields)?;
                    staged.insert(id.clone(), fields.clone());
                }
            }
        }

        partitions.insert(batch.kind().clone(), staged);
        debug!(kind = %batch.kind(), mutations = batch.len(), "applied batch");
        Ok(())
    }
}
