//! Two-level `storm_type -> outcome -> slug` lookup built from a manifest.

use std::collections::HashMap;

use shared::{
    domain::{storm_type_label, Method},
    protocol::ManifestDocument,
};

pub const DEFAULT_STORM_TYPE: &str = "hurricane";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestIndex {
    order: Vec<String>,
    slugs: HashMap<String, HashMap<String, String>>,
}

impl ManifestIndex {
    /// Studies whose method differs from `method_filter` are skipped. Later
    /// duplicates of a `(storm_type, outcome)` pair replace earlier ones.
    pub fn build(manifest: &ManifestDocument, method_filter: Option<Method>) -> Self {
        let mut index = Self::default();
        for study in &manifest.studies {
            if let Some(filter) = method_filter {
                let method = study
                    .method
                    .as_deref()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                if method != filter.as_str() {
                    continue;
                }
            }

            if !index.slugs.contains_key(&study.storm_type) {
                index.order.push(study.storm_type.clone());
            }
            index
                .slugs
                .entry(study.storm_type.clone())
                .or_default()
                .insert(study.outcome.clone(), study.slug.clone());
        }
        index
    }

    pub fn lookup(&self, storm_type: &str, outcome: &str) -> Option<&str> {
        self.slugs
            .get(storm_type)
            .and_then(|outcomes| outcomes.get(outcome))
            .map(String::as_str)
    }

    pub fn contains(&self, storm_type: &str) -> bool {
        self.slugs.contains_key(storm_type)
    }

    /// Storm types in the order the manifest first mentions them.
    pub fn storm_types(&self) -> &[String] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Options for a storm-type picker: `(key, display label)`.
    pub fn storm_options(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .map(|key| (key.clone(), storm_type_label(key).to_string()))
            .collect()
    }

    /// Initial storm type: the preferred key when present, then `hurricane`,
    /// then the first discovered key.
    pub fn default_storm_type(&self, preferred: Option<&str>) -> Option<String> {
        let preferred = preferred
            .map(|key| key.trim().to_ascii_lowercase())
            .filter(|key| self.contains(key));
        preferred
            .or_else(|| {
                self.contains(DEFAULT_STORM_TYPE)
                    .then(|| DEFAULT_STORM_TYPE.to_string())
            })
            .or_else(|| self.order.first().cloned())
    }

    /// Keeps `current` if this index still knows it, otherwise falls back to
    /// the first available key.
    pub fn reconcile(&self, current: Option<&str>) -> Option<String> {
        match current {
            Some(key) if self.contains(key) => Some(key.to_string()),
            _ => self.order.first().cloned(),
        }
    }
}
