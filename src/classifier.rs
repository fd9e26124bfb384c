use regex::Regex;

use crate::catalog::PriceCatalog;

/// Variant suffixes from most to least specific. A "Pro Max" title also
/// matches the "Pro" pattern, so the order decides the winner.
const VARIANTS: &[(&str, &str)] = &[
    (r"\s*pro\s*max\b", " Pro Max"),
    (r"\s*pro\b", " Pro"),
    (r"\s*mini\b", " mini"),
    (r"\s*plus\b", " Plus"),
    (r"\b", ""),
];

/// Maps free-form listing titles onto canonical catalog keys.
pub struct Classifier {
    catalog: PriceCatalog,
    patterns: Vec<(Regex, &'static str)>,
}

impl Classifier {
    pub fn new(catalog: PriceCatalog) -> Self {
        let family = regex::escape(&catalog.family().to_lowercase());
        let patterns = VARIANTS
            .iter()
            .filter_map(|(suffix, variant)| {
                Regex::new(&format!(r"{}\s*(\d+){}", family, suffix))
                    .ok()
                    .map(|regex| (regex, *variant))
            })
            .collect();

        Self { catalog, patterns }
    }

    pub fn catalog(&self) -> &PriceCatalog {
        &self.catalog
    }

    /// Returns the canonical catalog key for `title`, or `None` when the title
    /// is unclassifiable. Only the first matching pattern is considered.
    pub fn classify(&self, title: &str) -> Option<String> {
        let normalized = normalize_title(title);

        let (regex, variant) = self
            .patterns
            .iter()
            .find(|(regex, _)| regex.is_match(&normalized))?;
        let generation = regex.captures(&normalized)?.get(1)?.as_str();
        let candidate = format!("{}{}", generation, variant);

        match self.catalog.canonical_key(&candidate) {
            Some(key) => Some(key.to_string()),
            None => {
                tracing::trace!(title, candidate = %candidate, "No catalog entry for classified title");
                None
            }
        }
    }
}

/// Lowercases, replaces anything non-alphanumeric with a space and collapses
/// runs of whitespace.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
