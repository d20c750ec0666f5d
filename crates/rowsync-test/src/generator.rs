//! Feed generator - seeded vendor and speaker rows
//!
//! Rows are drawn from small name pools so that duplicates, case variants
//! and clock ties occur often enough to exercise conflict resolution.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rowsync_core::{Entry, Timestamp, UPDATED_FIELD};
use rowsync_sync::{speaker, vendor};
use serde_json::{Map, Value};

const COMPANIES: &[&str] = &[
    "280 North, Inc.",
    "Acme Widgets",
    "Globex Corporation",
    "Initech",
    "Umbrella (EU)",
    "Soylent & Sons",
    "Hooli",
    "Pied Piper",
    "Ünïcödé GmbH",
    "!!!",
];

const PODS: &[&str] = &["Google APIs", "Android", "Chrome", "GWT", "App Engine", "Wave"];

const SPEAKERS: &[(&str, &str)] = &[
    ("Aaron Koblin", "AaronKoblin"),
    ("Jane Doe (Keynote)", "jdoe"),
    ("Jane Doe", "jdoe2"),
    ("Li Wei", "liwei"),
    ("Sam O'Neil", "soneil"),
];

/// Generator configuration
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Rows per feed
    pub rows: usize,
    /// Clock values are drawn from `base_clock..base_clock + clock_spread`
    pub base_clock: i64,
    pub clock_spread: i64,
    /// Probability that a name is re-cased (same identity, different text)
    pub recase_prob: f64,
    /// Probability that an optional cell is left out
    pub omit_prob: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            rows: 50,
            base_clock: 1_000,
            clock_spread: 100,
            recase_prob: 0.2,
            omit_prob: 0.1,
            seed: 42,
        }
    }
}

impl GeneratorConfig {
    /// Small feed for quick tests
    pub fn light() -> Self {
        GeneratorConfig {
            rows: 12,
            ..GeneratorConfig::default()
        }
    }

    /// Large feed for benches
    pub fn heavy() -> Self {
        GeneratorConfig {
            rows: 5_000,
            clock_spread: 10_000,
            ..GeneratorConfig::default()
        }
    }
}

pub struct FeedGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl FeedGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        FeedGenerator { config, rng }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn clock(&mut self) -> Timestamp {
        let spread = self.config.clock_spread.max(1);
        Timestamp::from_millis(self.config.base_clock + self.rng.gen_range(0..spread))
    }

    fn maybe_recase(&mut self, name: &str) -> String {
        if self.rng.gen::<f64>() < self.config.recase_prob {
            name.to_uppercase()
        } else {
            name.to_string()
        }
    }

    fn keep_optional(&mut self) -> bool {
        self.rng.gen::<f64>() >= self.config.omit_prob
    }

    /// One vendor row
    pub fn vendor_entry(&mut self) -> Entry {
        let company = COMPANIES[self.rng.gen_range(0..COMPANIES.len())];
        let name = self.maybe_recase(company);
        let mut entry = Entry::new(self.clock()).with_field(vendor::COMPANY_NAME, name);

        if self.keep_optional() {
            let pod = PODS[self.rng.gen_range(0..PODS.len())];
            entry.insert(vendor::COMPANY_POD, pod);
        }
        if self.keep_optional() {
            let logo = format!("{}.png", company.to_lowercase().replace(' ', "_"));
            entry.insert(vendor::COMPANY_LOGO, logo);
        }
        if self.keep_optional() {
            entry.insert(vendor::COMPANY_LOCATION, "Mountain View, California");
        }
        if self.keep_optional() {
            let n: u32 = self.rng.gen();
            entry.insert(vendor::COMPANY_DESC, format!("Exhibitor description #{}", n));
        }
        entry
    }

    /// One speaker row
    pub fn speaker_entry(&mut self) -> Entry {
        let (title, ldap) = SPEAKERS[self.rng.gen_range(0..SPEAKERS.len())];
        let title = self.maybe_recase(title);
        let mut entry = Entry::new(self.clock()).with_field(speaker::SPEAKER_TITLE, title);

        if self.keep_optional() {
            entry.insert(speaker::SPEAKER_LDAP, ldap);
        }
        if self.keep_optional() {
            entry.insert(speaker::SPEAKER_COMPANY, "Google");
        }
        if self.keep_optional() {
            entry.insert(speaker::SPEAKER_ABSTRACT, "Talks about data and the web.");
        }
        entry
    }

    pub fn vendor_feed(&mut self) -> Vec<Entry> {
        (0..self.config.rows).map(|_| self.vendor_entry()).collect()
    }

    pub fn speaker_feed(&mut self) -> Vec<Entry> {
        (0..self.config.rows).map(|_| self.speaker_entry()).collect()
    }

    /// Copy of `feed` where roughly `fraction` of the rows carry a newer clock
    pub fn advance_clocks(&mut self, feed: &[Entry], fraction: f64) -> Vec<Entry> {
        feed.iter()
            .map(|entry| {
                if self.rng.gen::<f64>() >= fraction {
                    return entry.clone();
                }
                let bump = self.rng.gen_range(1..=self.config.clock_spread.max(1));
                let mut next = Entry::new(Timestamp::from_millis(entry.updated().as_millis() + bump));
                for (name, value) in entry.iter() {
                    next.insert(name, value);
                }
                next
            })
            .collect()
    }
}

/// Render entries as a JSON-lines document, clocks as integer millis
pub fn to_jsonl(entries: &[Entry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let mut object = Map::new();
        object.insert(
            UPDATED_FIELD.to_string(),
            Value::from(entry.updated().as_millis()),
        );
        for (name, value) in entry.iter() {
            object.insert(name.to_string(), Value::from(value));
        }
        out.push_str(&Value::Object(object).to_string());
        out.push('\n');
    }
    out
}
