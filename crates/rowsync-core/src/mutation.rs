//! Mutations and batches
//!
//! A batch is the whole output of one reconciliation pass: an ordered list of
//! delete/upsert pairs that the store applies as a single all-or-nothing unit.

use std::collections::HashMap;

use crate::{EntityKind, FieldMap, RecordId, Timestamp, UPDATED_FIELD};

/// Store mutation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// Remove every stored field of the record
    Delete(RecordId),
    /// Insert the record with exactly these fields
    Upsert { id: RecordId, fields: FieldMap },
}

impl Mutation {
    pub fn id(&self) -> &RecordId {
        match self {
            Mutation::Delete(id) => id,
            Mutation::Upsert { id, .. } => id,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Mutation::Delete(_))
    }
}

/// Per-pass counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Entries read from the feed
    pub seen: u32,
    /// Entries that produced a delete/upsert pair
    pub superseded: u32,
    /// Entries not newer than the local record
    pub skipped: u32,
    /// Superseding entries that replaced a pair already in this batch
    pub replaced: u32,
}

/// Pending pair for one identity
#[derive(Clone, Copy, Debug)]
struct PairSlot {
    /// Index of the delete; the upsert sits at `at + 1`
    at: usize,
    updated: Timestamp,
}

/// Ordered, atomically-applied mutation list for one entity kind
#[derive(Clone, Debug)]
pub struct Batch {
    kind: EntityKind,
    ops: Vec<Mutation>,
    pairs: HashMap<RecordId, PairSlot>,
    stats: PassStats,
}

impl Batch {
    pub fn new(kind: EntityKind) -> Self {
        Batch {
            kind,
            ops: Vec::new(),
            pairs: HashMap::new(),
            stats: PassStats::default(),
        }
    }

    /// Append a delete immediately followed by an upsert for `id`.
    ///
    /// If `id` already has a pair in this batch, that pair's upsert is
    /// replaced in place and `true` is returned; the batch never holds two
    /// pairs for one identity.
    pub fn append(&mut self, id: RecordId, fields: FieldMap) -> bool {
        let updated = fields
            .get(UPDATED_FIELD)
            .and_then(|v| v.as_integer())
            .map(Timestamp::from_millis)
            .unwrap_or(Timestamp::NEVER);

        if let Some(slot) = self.pairs.get_mut(&id) {
            slot.updated = updated;
            self.ops[slot.at + 1] = Mutation::Upsert { id, fields };
            return true;
        }

        let at = self.ops.len();
        self.ops.push(Mutation::Delete(id.clone()));
        self.ops.push(Mutation::Upsert {
            id: id.clone(),
            fields,
        });
        self.pairs.insert(id, PairSlot { at, updated });
        false
    }

    /// Clock of the upsert already queued for `id` in this batch
    pub fn pending_updated(&self, id: &RecordId) -> Option<Timestamp> {
        self.pairs.get(id).map(|slot| slot.updated)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.pairs.contains_key(id)
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn ops(&self) -> &[Mutation] {
        &self.ops
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mutation> {
        self.ops.iter()
    }

    pub fn into_ops(self) -> Vec<Mutation> {
        self.ops
    }

    /// Number of mutations (two per superseded identity)
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of identities touched
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn stats(&self) -> &PassStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut PassStats {
        &mut self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sanitize_id, FieldValue};

    fn id(raw: &str) -> RecordId {
        RecordId::from_sanitized(sanitize_id(raw, false, 64))
    }

    fn fields(updated: i64, name: &str) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(UPDATED_FIELD.to_string(), FieldValue::Integer(updated));
        map.insert("name".to_string(), FieldValue::from(name));
        map
    }

    #[test]
    fn test_append_emits_delete_then_upsert() {
        let mut batch = Batch::new(EntityKind::VENDOR);
        assert!(!batch.append(id("acme"), fields(10, "Acme")));

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.pair_count(), 1);
        assert_eq!(batch.ops()[0], Mutation::Delete(id("acme")));
        assert!(matches!(&batch.ops()[1], Mutation::Upsert { id: i, .. } if *i == id("acme")));
        assert_eq!(batch.pending_updated(&id("acme")), Some(Timestamp::from_millis(10)));
    }

    #[test]
    fn test_append_same_identity_replaces_in_place() {
        let mut batch = Batch::new(EntityKind::VENDOR);
        batch.append(id("acme"), fields(10, "Acme"));
        batch.append(id("globex"), fields(11, "Globex"));
        assert!(batch.append(id("acme"), fields(20, "Acme Corp")));

        assert_eq!(batch.len(), 4);
        assert_eq!(batch.pair_count(), 2);
        match &batch.ops()[1] {
            Mutation::Upsert { fields, .. } => {
                assert_eq!(fields.get("name"), Some(&FieldValue::from("Acme Corp")));
            }
            other => panic!("expected upsert, got {:?}", other),
        }
        assert_eq!(batch.pending_updated(&id("acme")), Some(Timestamp::from_millis(20)));
    }

    #[test]
    fn test_each_delete_precedes_its_upsert() {
        let mut batch = Batch::new(EntityKind::SPEAKER);
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            batch.append(id(name), fields(i as i64, name));
        }
        for pair in batch.ops().chunks(2) {
            assert!(pair[0].is_delete());
            assert!(!pair[1].is_delete());
            assert_eq!(pair[0].id(), pair[1].id());
        }
    }
}
