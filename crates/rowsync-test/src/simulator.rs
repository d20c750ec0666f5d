//! Multi-pass sync simulator
//!
//! Drives repeated passes of generated feeds through a [`SyncEngine`] into a
//! [`MemoryStore`], marking records with local owned values in between, and
//! checks after every pass that:
//! - each batch holds at most one delete/upsert pair per identity
//! - no stored clock moves backwards
//! - owned values set locally survive every overwrite
//! - re-running a feed that was just applied produces an empty batch

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Cursor;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rowsync_core::{
    Batch, EntityKind, Entry, FieldValue, Mutation, RecordId, SyncResult, Timestamp,
    UPDATED_FIELD,
};
use rowsync_feed::{JsonLinesSource, MemoryReader, TagEntryReader};
use rowsync_store::MemoryStore;
use rowsync_sync::{SyncConfig, SyncContext, SyncEngine};
use tracing::debug;

use crate::{to_jsonl, FeedGenerator, GeneratorConfig};

/// Simulation configuration
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    pub generator: GeneratorConfig,
    /// Number of feed rounds per kind
    pub rounds: usize,
    /// Share of rows whose clock moves forward between rounds
    pub advance_fraction: f64,
    /// Share of stored records given a local owned value between rounds
    pub mark_fraction: f64,
    /// Feed rows through the JSON-lines reader instead of in memory
    pub use_jsonl: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            generator: GeneratorConfig::default(),
            rounds: 4,
            advance_fraction: 0.3,
            mark_fraction: 0.25,
            use_jsonl: false,
        }
    }
}

/// Result of a simulation run
#[derive(Clone, Debug, Default)]
pub struct SimulationReport {
    pub passes: usize,
    pub mutations: usize,
    pub marked: usize,
    /// Re-runs of an applied feed that still produced mutations
    pub idempotence_violations: usize,
    /// Batches with more than one pair for some identity
    pub pair_violations: usize,
    /// Stored clocks that went backwards
    pub clock_regressions: usize,
    /// Locally set owned values that were lost
    pub owned_lost: usize,
}

impl SimulationReport {
    pub fn is_clean(&self) -> bool {
        self.idempotence_violations == 0
            && self.pair_violations == 0
            && self.clock_regressions == 0
            && self.owned_lost == 0
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passes, {} mutations, {} marked; violations: idempotence={} pairs={} clocks={} owned={}",
            self.passes,
            self.mutations,
            self.marked,
            self.idempotence_violations,
            self.pair_violations,
            self.clock_regressions,
            self.owned_lost
        )
    }
}

pub struct SyncSimulator {
    config: SimulatorConfig,
    engine: SyncEngine,
    store: MemoryStore,
    generator: FeedGenerator,
    rng: StdRng,
    /// (kind, id, field) -> value set locally
    marks: HashMap<(EntityKind, RecordId, String), FieldValue>,
    report: SimulationReport,
}

impl SyncSimulator {
    pub fn new(config: SimulatorConfig) -> SyncResult<Self> {
        let ctx = SyncConfig::default().into_context()?;
        Ok(Self::with_context(config, ctx))
    }

    pub fn with_context(config: SimulatorConfig, ctx: SyncContext) -> Self {
        let generator = FeedGenerator::new(config.generator.clone());
        let rng = StdRng::seed_from_u64(config.generator.seed ^ 0x5eed);
        SyncSimulator {
            engine: SyncEngine::with_default_policies(ctx),
            store: MemoryStore::new(),
            generator,
            rng,
            marks: HashMap::new(),
            report: SimulationReport::default(),
            config,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn report(&self) -> &SimulationReport {
        &self.report
    }

    /// Run all rounds for both built-in kinds
    pub fn run(&mut self) -> SyncResult<SimulationReport> {
        for kind in [EntityKind::VENDOR, EntityKind::SPEAKER] {
            let mut feed = self.initial_feed(&kind);
            for round in 0..self.config.rounds {
                debug!(%kind, round, rows = feed.len(), "simulation round");
                self.pass(&kind, &feed)?;
                self.check_rerun(&kind, &feed)?;
                self.mark_records(&kind);
                feed = self
                    .generator
                    .advance_clocks(&feed, self.config.advance_fraction);
            }
        }
        Ok(self.report.clone())
    }

    fn initial_feed(&mut self, kind: &EntityKind) -> Vec<Entry> {
        if *kind == EntityKind::SPEAKER {
            self.generator.speaker_feed()
        } else {
            self.generator.vendor_feed()
        }
    }

    /// Sync and apply one feed, checking the batch and the store afterwards
    pub fn pass(&mut self, kind: &EntityKind, feed: &[Entry]) -> SyncResult<Batch> {
        let before = self.stored_clocks(kind);
        let batch = self.apply(kind, feed)?;

        self.report.passes += 1;
        self.report.mutations += batch.len();
        if !has_unique_pairs(&batch) {
            self.report.pair_violations += 1;
        }

        let after = self.stored_clocks(kind);
        for (id, clock) in &before {
            if after.get(id).map_or(true, |now| now < clock) {
                self.report.clock_regressions += 1;
            }
        }
        self.check_marks(kind);
        Ok(batch)
    }

    fn apply(&self, kind: &EntityKind, feed: &[Entry]) -> SyncResult<Batch> {
        if self.config.use_jsonl {
            let text = to_jsonl(feed);
            let source = JsonLinesSource::new(Cursor::new(text.into_bytes()));
            let mut reader = TagEntryReader::new(source);
            self.engine.sync_and_apply(kind, &mut reader, &self.store)
        } else {
            let mut reader = MemoryReader::new(feed.iter().cloned());
            self.engine.sync_and_apply(kind, &mut reader, &self.store)
        }
    }

    fn check_rerun(&mut self, kind: &EntityKind, feed: &[Entry]) -> SyncResult<()> {
        let batch = self.pass(kind, feed)?;
        if !batch.is_empty() {
            self.report.idempotence_violations += 1;
        }
        Ok(())
    }

    /// Give a share of stored records a local value in each owned field
    fn mark_records(&mut self, kind: &EntityKind) {
        let owned = match self.engine.policy(kind) {
            Some(policy) if !policy.owned_fields.is_empty() => policy.owned_fields.clone(),
            _ => return,
        };

        for id in self.store.ids(kind) {
            if self.rng.gen::<f64>() >= self.config.mark_fraction {
                continue;
            }
            for field in &owned {
                let value = FieldValue::Integer(self.rng.gen_range(1..=5));
                if self.store.set_field(kind, &id, field.clone(), value.clone()) {
                    self.marks.insert((kind.clone(), id.clone(), field.clone()), value);
                    self.report.marked += 1;
                }
            }
        }
    }

    fn check_marks(&mut self, kind: &EntityKind) {
        let records = self.store.dump(kind);
        for ((mark_kind, id, field), value) in &self.marks {
            if mark_kind != kind {
                continue;
            }
            let kept = records
                .get(id)
                .and_then(|fields| fields.get(field))
                .is_some_and(|v| v == value);
            if !kept {
                self.report.owned_lost += 1;
            }
        }
    }

    fn stored_clocks(&self, kind: &EntityKind) -> HashMap<RecordId, Timestamp> {
        self.store
            .dump(kind)
            .into_iter()
            .map(|(id, fields)| {
                let clock = fields
                    .get(UPDATED_FIELD)
                    .and_then(FieldValue::as_integer)
                    .map_or(Timestamp::NEVER, Timestamp::from_millis);
                (id, clock)
            })
            .collect()
    }
}

/// True when no identity has more than one delete or upsert in `batch`,
/// and every delete is immediately followed by its upsert
pub fn has_unique_pairs(batch: &Batch) -> bool {
    let mut seen = HashSet::new();
    let ops = batch.ops();
    if ops.len() % 2 != 0 {
        return false;
    }
    ops.chunks(2).all(|pair| match pair {
        [Mutation::Delete(a), Mutation::Upsert { id: b, .. }] => a == b && seen.insert(a.clone()),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_tracing;
    use proptest::prelude::*;
    use rowsync_sync::vendor;

    #[test]
    fn test_default_simulation_is_clean() {
        init_tracing();
        let mut sim = SyncSimulator::new(SimulatorConfig::default()).unwrap();
        let report = sim.run().unwrap();
        assert!(report.is_clean(), "{}", report);
        assert!(report.mutations > 0);
        assert!(report.marked > 0);
        assert!(!sim.store().is_empty(&EntityKind::VENDOR));
        assert!(!sim.store().is_empty(&EntityKind::SPEAKER));
    }

    #[test]
    fn test_jsonl_simulation_is_clean() {
        let config = SimulatorConfig {
            generator: GeneratorConfig::light(),
            use_jsonl: true,
            ..SimulatorConfig::default()
        };
        let mut sim = SyncSimulator::new(config).unwrap();
        let report = sim.run().unwrap();
        assert!(report.is_clean(), "{}", report);
    }

    #[test]
    fn test_stale_feed_changes_nothing() {
        let mut sim = SyncSimulator::new(SimulatorConfig::default()).unwrap();
        let newer = vec![Entry::new(Timestamp::from_millis(500))
            .with_field(vendor::COMPANY_NAME, "Acme")];
        let older = vec![Entry::new(Timestamp::from_millis(400))
            .with_field(vendor::COMPANY_NAME, "Acme")
            .with_field(vendor::COMPANY_LOCATION, "Nowhere")];

        assert_eq!(sim.pass(&EntityKind::VENDOR, &newer).unwrap().len(), 2);
        assert!(sim.pass(&EntityKind::VENDOR, &older).unwrap().is_empty());

        let stored = sim
            .store()
            .get(&EntityKind::VENDOR, &RecordId::from_raw("Acme"))
            .unwrap();
        assert!(stored.get(vendor::LOCATION).is_none());
        assert!(sim.report().is_clean());
    }

    #[test]
    fn test_unique_pairs_check() {
        let kind = EntityKind::VENDOR;
        let mut batch = Batch::new(kind);
        let mut fields = rowsync_core::FieldMap::new();
        fields.insert(UPDATED_FIELD.into(), FieldValue::Integer(1));
        batch.append(RecordId::from_raw("a"), fields.clone());
        batch.append(RecordId::from_raw("b"), fields);
        assert!(has_unique_pairs(&batch));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_simulation_holds_invariants(
            seed in any::<u64>(),
            rows in 1usize..40,
            spread in 1i64..50,
            advance in 0.0f64..1.0,
        ) {
            let config = SimulatorConfig {
                generator: GeneratorConfig {
                    rows,
                    clock_spread: spread,
                    seed,
                    ..GeneratorConfig::default()
                },
                rounds: 3,
                advance_fraction: advance,
                ..SimulatorConfig::default()
            };
            let mut sim = SyncSimulator::new(config).unwrap();
            let report = sim.run().unwrap();
            prop_assert!(report.is_clean(), "{}", report);
        }
    }
}
