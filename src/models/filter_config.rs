use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use validator::Validate;

use crate::catalog::PriceCatalog;

pub const MIN_PAGES: u32 = 1;
pub const MAX_PAGES: u32 = 100;

/// Live rule set evaluated by the pipeline. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FilterConfig {
    pub active_models: BTreeSet<String>,
    #[serde(default)]
    pub required_keywords: Vec<String>,
    #[serde(default)]
    pub blocked_keywords: Vec<String>,
    #[serde(default)]
    pub include_damaged: bool,
    #[serde(default)]
    pub ignore_age_limit: bool,
    #[validate(range(min = 1, max = 168))]
    pub max_ad_age_hours: u32,
    #[validate(range(min = 1, max = 100))]
    pub max_pages: u32,
    pub active: bool,
}

impl FilterConfig {
    /// Page count the pipeline will actually walk, whatever the editor stored.
    pub fn page_count(&self) -> u32 {
        self.max_pages.clamp(MIN_PAGES, MAX_PAGES)
    }

    /// Drops blank keywords and trims the rest.
    pub fn normalized(mut self) -> Self {
        let clean = |words: Vec<String>| -> Vec<String> {
            words
                .into_iter()
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .collect()
        };
        self.required_keywords = clean(self.required_keywords);
        self.blocked_keywords = clean(self.blocked_keywords);
        self
    }

    /// Rewrites `active_models` in the catalog's spelling. On any unknown name
    /// the set is left untouched and the unknown names are returned.
    pub fn canonicalize_models(&mut self, catalog: &PriceCatalog) -> Result<(), Vec<String>> {
        let mut unknown = Vec::new();
        let mut canonical = BTreeSet::new();
        for model in &self.active_models {
            match catalog.canonical_key(model.trim()) {
                Some(key) => {
                    canonical.insert(key.to_string());
                }
                None => unknown.push(model.clone()),
            }
        }
        if !unknown.is_empty() {
            return Err(unknown);
        }
        self.active_models = canonical;
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            active_models: BTreeSet::new(),
            required_keywords: vec!["Stan bardzo dobry".to_string(), "Stan idealny".to_string()],
            blocked_keywords: vec![
                "uszkodzony".to_string(),
                "tylko części".to_string(),
                "blokada".to_string(),
                "uszkodzone".to_string(),
                "nie działa".to_string(),
            ],
            include_damaged: false,
            ignore_age_limit: false,
            max_ad_age_hours: 12,
            max_pages: 5,
            active: true,
        }
    }
}

/// Shared holder for the current `FilterConfig`.
///
/// Readers take an `Arc` snapshot, so a scan keeps a consistent view even if
/// the editor swaps the config halfway through.
#[derive(Debug, Clone)]
pub struct FilterConfigStore {
    current: Arc<RwLock<Arc<FilterConfig>>>,
}

impl FilterConfigStore {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config.normalized()))),
        }
    }

    pub async fn snapshot(&self) -> Arc<FilterConfig> {
        Arc::clone(&*self.current.read().await)
    }

    /// Atomically swaps in a new config and returns the one it replaced.
    pub async fn replace(&self, config: FilterConfig) -> Arc<FilterConfig> {
        let mut current = self.current.write().await;
        std::mem::replace(&mut *current, Arc::new(config.normalized()))
    }
}
