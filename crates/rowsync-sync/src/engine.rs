//! Reconciliation pass driver
//!
//! One pass reads the feed to its end, and for each row:
//! 1. Derive the record identity
//! 2. Resolve against the store snapshot (and any pair already queued)
//! 3. Map fields, inheriting owned fields
//! 4. Append the delete/upsert pair to the batch
//!
//! The pass performs no writes. Any feed or store error discards the batch.

use std::collections::HashMap;

use rowsync_core::{Batch, EntityKind, SyncError, SyncResult};
use rowsync_feed::EntryReader;
use rowsync_store::{BatchSink, SnapshotSource, Store};
use tracing::{info, info_span, trace, warn};

use crate::{map_fields, ConflictResolver, KindLocks, KindPolicy, Resolution, SyncContext};

/// Run one reconciliation pass for `policy.kind`
pub fn sync_pass<R, S>(
    policy: &KindPolicy,
    reader: &mut R,
    store: &S,
    ctx: &SyncContext,
) -> SyncResult<Batch>
where
    R: EntryReader + ?Sized,
    S: SnapshotSource + ?Sized,
{
    let span = info_span!("sync_pass", kind = %policy.kind);
    let _enter = span.enter();
    policy.validate()?;

    let mut batch = Batch::new(policy.kind.clone());
    match run_pass(policy, reader, store, ctx, &mut batch) {
        Ok(()) => {
            let stats = batch.stats();
            info!(
                seen = stats.seen,
                superseded = stats.superseded,
                replaced = stats.replaced,
                skipped = stats.skipped,
                mutations = batch.len(),
                "sync pass complete"
            );
            Ok(batch)
        }
        Err(e) => {
            warn!(error = %e, row = reader.row(), "sync pass aborted, batch discarded");
            Err(e)
        }
    }
}

fn run_pass<R, S>(
    policy: &KindPolicy,
    reader: &mut R,
    store: &S,
    ctx: &SyncContext,
    batch: &mut Batch,
) -> SyncResult<()>
where
    R: EntryReader + ?Sized,
    S: SnapshotSource + ?Sized,
{
    let resolver = ConflictResolver::new(store, policy);

    while let Some(entry) = reader.advance()? {
        let row = reader.row();
        batch.stats_mut().seen += 1;

        if entry.updated().is_never() {
            return Err(SyncError::malformed(row, "entry clock is the reserved never value"));
        }

        // Stage 1: identity
        let id = policy.identity.derive(&entry).ok_or_else(|| {
            SyncError::malformed(
                row,
                format!("entry has no {} cell", policy.identity.primary),
            )
        })?;

        // Stage 2: conflict resolution
        let owned = match resolver.resolve(&id, entry.updated(), batch.pending_updated(&id))? {
            Resolution::Skip => {
                trace!(%id, row, "local record is current");
                batch.stats_mut().skipped += 1;
                continue;
            }
            Resolution::Supersede(owned) => owned,
        };

        // Stage 3: field mapping
        let fields = map_fields(&entry, &id, &owned, policy, ctx);

        // Stage 4: batch
        if batch.append(id, fields) {
            batch.stats_mut().replaced += 1;
        } else {
            batch.stats_mut().superseded += 1;
        }
    }

    Ok(())
}

/// Policy registry plus injected configuration
///
/// Entry point for schedulers: one call per kind per sync.
#[derive(Debug)]
pub struct SyncEngine {
    ctx: SyncContext,
    policies: HashMap<EntityKind, KindPolicy>,
    locks: KindLocks,
}

impl SyncEngine {
    pub fn new(ctx: SyncContext) -> Self {
        SyncEngine {
            ctx,
            policies: HashMap::new(),
            locks: KindLocks::new(),
        }
    }

    /// Engine with the vendor and speaker policies registered
    pub fn with_default_policies(ctx: SyncContext) -> Self {
        let max_id_len = ctx.max_id_len;
        SyncEngine::new(ctx)
            .with_policy(KindPolicy::vendor().with_max_id_len(max_id_len))
            .with_policy(KindPolicy::speaker().with_max_id_len(max_id_len))
    }

    /// Register (or replace) the policy for its kind
    pub fn with_policy(mut self, policy: KindPolicy) -> Self {
        self.policies.insert(policy.kind.clone(), policy);
        self
    }

    pub fn policy(&self, kind: &EntityKind) -> Option<&KindPolicy> {
        self.policies.get(kind)
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn locks(&self) -> &KindLocks {
        &self.locks
    }

    /// Build the batch for one kind without applying it
    pub fn sync<R, S>(&self, kind: &EntityKind, reader: &mut R, store: &S) -> SyncResult<Batch>
    where
        R: EntryReader + ?Sized,
        S: SnapshotSource + ?Sized,
    {
        let policy = self.require_policy(kind)?;
        sync_pass(policy, reader, store, &self.ctx)
    }

    /// Claim the kind, build its batch and hand it to the store.
    ///
    /// The claim is released on every path. A store failure leaves the
    /// store as it was; the returned batch has been applied.
    pub fn sync_and_apply<R, S>(
        &self,
        kind: &EntityKind,
        reader: &mut R,
        store: &S,
    ) -> SyncResult<Batch>
    where
        R: EntryReader + ?Sized,
        S: Store + ?Sized,
    {
        let policy = self.require_policy(kind)?;
        let _guard = self.locks.acquire(kind)?;

        let batch = sync_pass(policy, reader, store, &self.ctx)?;
        if let Err(e) = store.apply_batch(&batch) {
            warn!(%kind, error = %e, mutations = batch.len(), "batch apply failed");
            return Err(e.into());
        }
        Ok(batch)
    }

    fn require_policy(&self, kind: &EntityKind) -> SyncResult<&KindPolicy> {
        self.policies
            .get(kind)
            .ok_or_else(|| SyncError::Config(format!("no sync policy for kind {}", kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{vendor, AliasTable, SyncConfig};
    use rowsync_core::{Entry, FieldValue, Mutation, RecordId, StoreError, Timestamp, UPDATED_FIELD};
    use rowsync_feed::{MemoryReader, TagEntryReader, TagEvent, VecTagSource};
    use rowsync_core::LocalSnapshot;
    use rowsync_store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory store whose `fail_at`-th snapshot lookup (zero-based) fails
    struct FlakyReads {
        inner: MemoryStore,
        lookups: AtomicUsize,
        fail_at: usize,
    }

    impl SnapshotSource for FlakyReads {
        fn snapshot(
            &self,
            kind: &EntityKind,
            id: &RecordId,
            owned_fields: &[String],
        ) -> Result<LocalSnapshot, StoreError> {
            if self.lookups.fetch_add(1, Ordering::SeqCst) == self.fail_at {
                return Err(StoreError::Unavailable("replica offline".into()));
            }
            self.inner.snapshot(kind, id, owned_fields)
        }
    }

    impl BatchSink for FlakyReads {
        fn apply_batch(&self, batch: &Batch) -> Result<(), StoreError> {
            self.inner.apply_batch(batch)
        }
    }

    fn engine() -> SyncEngine {
        let ctx = SyncConfig::default()
            .into_context()
            .unwrap()
            .with_aliases(AliasTable::from_iter([("google-apis", "googleapis")]));
        SyncEngine::with_default_policies(ctx)
    }

    fn north(updated: i64) -> Entry {
        Entry::new(Timestamp::from_millis(updated))
            .with_field(vendor::COMPANY_NAME, "280 North, Inc.")
            .with_field(vendor::COMPANY_POD, "Google APIs")
            .with_field(vendor::COMPANY_LOGO, "280north.png")
    }

    fn vendor_row(name: &str, updated: i64) -> Entry {
        Entry::new(Timestamp::from_millis(updated)).with_field(vendor::COMPANY_NAME, name)
    }

    fn upsert_fields(batch: &Batch, index: usize) -> &rowsync_core::FieldMap {
        match &batch.ops()[index] {
            Mutation::Upsert { fields, .. } => fields,
            other => panic!("expected upsert, got {:?}", other),
        }
    }

    #[test]
    fn test_first_sight_emits_pair() {
        let engine = engine();
        let store = MemoryStore::new();
        let mut reader = MemoryReader::new(vec![north(1000)]);

        let batch = engine.sync(&EntityKind::VENDOR, &mut reader, &store).unwrap();
        let id = RecordId::from_raw("280 North, Inc.");
        assert_eq!(id.as_str(), "280-north-inc");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ops()[0], Mutation::Delete(id));

        let fields = upsert_fields(&batch, 1);
        assert_eq!(fields.get(vendor::TRACK_ID), Some(&FieldValue::from("googleapis")));
        assert_eq!(
            fields.get(vendor::LOGO_URL),
            Some(&FieldValue::from(
                "http://code.google.com/events/io/2010/images/280north.png"
            ))
        );
        assert_eq!(batch.stats().superseded, 1);
    }

    #[test]
    fn test_tie_is_no_op() {
        let engine = engine();
        let store = MemoryStore::new();
        engine
            .sync_and_apply(&EntityKind::VENDOR, &mut MemoryReader::new(vec![north(1000)]), &store)
            .unwrap();

        let batch = engine
            .sync(&EntityKind::VENDOR, &mut MemoryReader::new(vec![north(1000)]), &store)
            .unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.stats().skipped, 1);
    }

    #[test]
    fn test_starred_survives_overwrite() {
        let engine = engine();
        let store = MemoryStore::new();
        engine
            .sync_and_apply(&EntityKind::VENDOR, &mut MemoryReader::new(vec![north(1000)]), &store)
            .unwrap();
        let id = RecordId::from_raw("280 North, Inc.");
        assert!(store.set_field(&EntityKind::VENDOR, &id, vendor::STARRED, 1));

        let batch = engine
            .sync_and_apply(&EntityKind::VENDOR, &mut MemoryReader::new(vec![north(2000)]), &store)
            .unwrap();
        let fields = upsert_fields(&batch, 1);
        assert_eq!(fields.get(vendor::STARRED), Some(&FieldValue::Integer(1)));
        assert_eq!(fields.get(UPDATED_FIELD), Some(&FieldValue::Integer(2000)));

        let stored = store.get(&EntityKind::VENDOR, &id).unwrap();
        assert_eq!(stored.get(vendor::STARRED), Some(&FieldValue::Integer(1)));
    }

    #[test]
    fn test_duplicate_rows_keep_one_pair() {
        let engine = engine();
        let store = MemoryStore::new();
        let mut reader = MemoryReader::new(vec![
            vendor_row("Acme", 100),
            vendor_row("Globex", 100),
            vendor_row("ACME", 300),
            vendor_row("acme", 200),
        ]);

        let batch = engine.sync(&EntityKind::VENDOR, &mut reader, &store).unwrap();
        assert_eq!(batch.pair_count(), 2);
        assert_eq!(batch.len(), 4);
        assert_eq!(
            upsert_fields(&batch, 1).get(vendor::NAME),
            Some(&FieldValue::from("ACME"))
        );
        let stats = batch.stats();
        assert_eq!((stats.seen, stats.superseded, stats.replaced, stats.skipped), (4, 2, 1, 1));
    }

    #[test]
    fn test_malformed_feed_discards_batch() {
        let engine = engine();
        let store = MemoryStore::new();
        let events = vec![
            TagEvent::StartEntry,
            TagEvent::field(vendor::COMPANY_NAME, "Acme"),
            TagEvent::Updated("1000".into()),
            TagEvent::EndEntry,
            TagEvent::StartEntry,
            TagEvent::field(vendor::COMPANY_NAME, "Globex"),
        ];
        let mut reader = TagEntryReader::new(VecTagSource::new(events));

        let err = engine
            .sync_and_apply(&EntityKind::VENDOR, &mut reader, &store)
            .unwrap_err();
        assert!(matches!(err, SyncError::MalformedFeed { row: 1, .. }));
        assert!(store.is_empty(&EntityKind::VENDOR));
        assert!(!engine.locks().is_held(&EntityKind::VENDOR));
    }

    #[test]
    fn test_missing_primary_is_malformed() {
        let engine = engine();
        let store = MemoryStore::new();
        let mut reader = MemoryReader::new(vec![
            vendor_row("Acme", 1),
            Entry::new(Timestamp::from_millis(2)).with_field(vendor::COMPANY_POD, "Android"),
        ]);
        let err = engine.sync(&EntityKind::VENDOR, &mut reader, &store).unwrap_err();
        assert!(matches!(err, SyncError::MalformedFeed { row: 1, .. }));
    }

    #[test]
    fn test_never_clock_is_malformed() {
        let engine = engine();
        let store = MemoryStore::new();
        let mut reader = MemoryReader::new(vec![vendor_row("Acme", i64::MIN)]);

        let err = engine.sync(&EntityKind::VENDOR, &mut reader, &store).unwrap_err();
        assert!(matches!(err, SyncError::MalformedFeed { row: 0, .. }));

        let mut oldest = MemoryReader::new(vec![vendor_row("Acme", i64::MIN + 1)]);
        let batch = engine.sync(&EntityKind::VENDOR, &mut oldest, &store).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_store_failure_surfaces_and_leaves_store_unchanged() {
        let engine = engine();
        let store = MemoryStore::new();
        store.fail_next_apply(StoreError::Unavailable("disk full".into()));

        let err = engine
            .sync_and_apply(&EntityKind::VENDOR, &mut MemoryReader::new(vec![north(1)]), &store)
            .unwrap_err();
        assert!(matches!(err, SyncError::Store(StoreError::Unavailable(_))));
        assert!(store.is_empty(&EntityKind::VENDOR));
        assert!(!engine.locks().is_held(&EntityKind::VENDOR));
    }

    #[test]
    fn test_snapshot_failure_aborts_pass() {
        let engine = engine();
        let store = FlakyReads {
            inner: MemoryStore::new(),
            lookups: AtomicUsize::new(0),
            fail_at: 1,
        };
        let mut reader = MemoryReader::new(vec![vendor_row("Acme", 1), vendor_row("Globex", 1)]);

        let err = engine
            .sync_and_apply(&EntityKind::VENDOR, &mut reader, &store)
            .unwrap_err();
        assert!(matches!(err, SyncError::Store(StoreError::Unavailable(_))));
        assert!(store.inner.is_empty(&EntityKind::VENDOR));
        assert!(!engine.locks().is_held(&EntityKind::VENDOR));
    }

    #[test]
    fn test_in_flight_kind_is_refused() {
        let engine = engine();
        let store = MemoryStore::new();
        let _held = engine.locks().acquire(&EntityKind::SPEAKER).unwrap();

        let err = engine
            .sync_and_apply(&EntityKind::SPEAKER, &mut MemoryReader::new(vec![]), &store)
            .unwrap_err();
        assert!(matches!(err, SyncError::PassInFlight(_)));

        engine
            .sync_and_apply(&EntityKind::VENDOR, &mut MemoryReader::new(vec![north(1)]), &store)
            .unwrap();
    }

    #[test]
    fn test_owned_clock_policy_is_refused() {
        let ctx = SyncConfig::default().into_context().unwrap();
        let engine = SyncEngine::new(ctx).with_policy(KindPolicy::vendor().owned(UPDATED_FIELD));
        let store = MemoryStore::new();

        let err = engine
            .sync_and_apply(&EntityKind::VENDOR, &mut MemoryReader::new(vec![north(1)]), &store)
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(store.is_empty(&EntityKind::VENDOR));
    }

    #[test]
    fn test_unknown_kind() {
        let engine = engine();
        let store = MemoryStore::new();
        let err = engine
            .sync(&EntityKind::new("session"), &mut MemoryReader::new(vec![]), &store)
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
