//! Flat property-file parsing and parameter resolution.
//!
//! SAP artifacts carry `key=value` property files (`parameters.prop`,
//! `metainfo.prop`) whose values back the `{{placeholder}}` references in
//! IFlow definitions.

use std::collections::BTreeMap;
use tracing::{debug, info};

/// Resolved configuration properties for one artifact, merged from one or
/// more property-file sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: BTreeMap<String, String>,
}

/// Parse flat `key=value` property-file text.
///
/// Every non-empty, non-`#`-comment line containing `=` contributes one
/// entry; the split happens on the first `=` only, so values may contain
/// `=`. Lines without `=` are skipped. Pure function: no valid lines yields
/// an empty map.
pub fn extract_properties(text: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            properties.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    properties
}

impl PropertyMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse property-file text into a fresh map
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let map = Self { entries: extract_properties(text) };
        for (key, value) in &map.entries {
            if key.to_lowercase().contains("auth") || key.to_lowercase().contains("certificate") {
                debug!("Authentication-related property: {} = {}", key, value);
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge another source into this map. Exact key collisions keep the
    /// value found first and are logged as informational.
    pub fn merge_first_wins(&mut self, source: &str, other: BTreeMap<String, String>) {
        for (key, value) in other {
            match self.entries.get(&key) {
                Some(existing) => {
                    info!(
                        "Property collision for '{}' from {}: keeping '{}'",
                        key, source, existing
                    );
                }
                None => {
                    self.entries.insert(key, value);
                }
            }
        }
    }

    /// Resolve a `{{name}}` placeholder against the map: exact key match
    /// first, then a `…_name` suffix match, then case-insensitive.
    pub fn resolve(&self, param_name: &str) -> Option<(&str, &str)> {
        let suffix = format!("_{param_name}");
        let lowered = param_name.to_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| {
                key.as_str() == param_name
                    || key.ends_with(&suffix)
                    || key.to_lowercase() == lowered
            })
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
