use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive price window for one catalog model, in the site's currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl PriceBand {
    pub fn new(min: i64, max: i64) -> Self {
        let (min, max) = (Decimal::from(min), Decimal::from(max));
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.min && price <= self.max
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub key: String,
    pub band: PriceBand,
}

/// Static model -> price band table. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct PriceCatalog {
    family: String,
    entries: BTreeMap<String, PriceBand>,
}

const DEFAULT_BANDS: &[(&str, i64, i64)] = &[
    ("11", 200, 350),
    ("11 Pro", 351, 450),
    ("11 Pro Max", 451, 500),
    ("12", 400, 600),
    ("12 Pro", 650, 800),
    ("12 Pro Max", 700, 850),
    ("12 mini", 350, 500),
    ("13", 600, 1000),
    ("13 Pro", 800, 1400),
    ("13 Pro Max", 800, 1500),
    ("13 mini", 600, 850),
    ("14", 800, 1500),
    ("14 Pro", 1000, 1600),
    ("14 Pro Max", 1000, 2000),
    ("14 Plus", 1000, 1700),
    ("15", 1300, 2000),
    ("15 Pro", 2000, 2900),
    ("15 Pro Max", 2000, 3100),
    ("15 Plus", 1000, 2100),
    ("16", 2500, 3300),
    ("16 Pro", 3300, 4000),
    ("16 Pro Max", 3500, 4200),
    ("17", 3500, 4300),
    ("17 Pro", 4300, 5000),
    ("17 Pro Max", 4500, 5200),
];

impl PriceCatalog {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, band: PriceBand) -> Self {
        self.entries.insert(key.into(), band);
        self
    }

    /// The product family token titles are anchored on, e.g. "iPhone".
    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn band(&self, key: &str) -> Option<PriceBand> {
        self.entries.get(key).copied()
    }

    /// Case-insensitive exact lookup returning the canonical key spelling.
    pub fn canonical_key(&self, candidate: &str) -> Option<&str> {
        self.entries
            .keys()
            .find(|key| key.eq_ignore_ascii_case(candidate))
            .map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.entries
            .iter()
            .map(|(key, band)| CatalogEntry {
                key: key.clone(),
                band: *band,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PriceCatalog {
    fn default() -> Self {
        DEFAULT_BANDS
            .iter()
            .fold(PriceCatalog::new("iPhone"), |catalog, (key, min, max)| {
                catalog.with_entry(*key, PriceBand::new(*min, *max))
            })
    }
}
