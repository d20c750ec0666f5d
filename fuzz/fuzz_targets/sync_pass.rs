#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rowsync_core::{EntityKind, Entry, Timestamp};
use rowsync_feed::MemoryReader;
use rowsync_store::MemoryStore;
use rowsync_sync::{vendor, SyncConfig, SyncEngine};

#[derive(Arbitrary, Debug)]
struct Row {
    name: String,
    pod: Option<String>,
    logo: Option<String>,
    updated: i64,
}

// Two passes over the same rows: the second must be empty. `i64::MIN` is
// the reserved never clock, which the pass rejects.
fuzz_target!(|rows: Vec<Row>| {
    let Ok(ctx) = SyncConfig::default().into_context() else {
        return;
    };
    let engine = SyncEngine::with_default_policies(ctx);
    let store = MemoryStore::new();

    let entries: Vec<Entry> = rows
        .into_iter()
        .map(|row| {
            let mut entry = Entry::new(Timestamp::from_millis(row.updated.max(i64::MIN + 1)))
                .with_field(vendor::COMPANY_NAME, row.name);
            if let Some(pod) = row.pod {
                entry.insert(vendor::COMPANY_POD, pod);
            }
            if let Some(logo) = row.logo {
                entry.insert(vendor::COMPANY_LOGO, logo);
            }
            entry
        })
        .collect();

    let first = engine
        .sync_and_apply(&EntityKind::VENDOR, &mut MemoryReader::new(entries.clone()), &store)
        .expect("in-memory pass cannot fail");
    assert!(first.pair_count() * 2 == first.len());

    let second = engine
        .sync(&EntityKind::VENDOR, &mut MemoryReader::new(entries), &store)
        .expect("in-memory pass cannot fail");
    assert!(second.is_empty());
});
