//! Shared, mutable catalogue of scraper definitions.
//!
//! The registry is the single source of truth for which sources exist:
//! HTTP handlers read snapshots from it, the compiler upserts into it,
//! and a JSON file can seed it at startup. Lookups are keyed by slug.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::definition::ScraperDefinition;
use crate::error::ScrapeError;

/// Thread-safe slug → definition map. Cloning shares the underlying
/// store. Writes are atomic: readers see either the old definition or
/// the new one, never a partial.
///
/// Callers insert validated definitions only; [`upsert`](Self::upsert)
/// does not re-validate. The compiler and the seed loader are the
/// validating gates.
#[derive(Clone, Default)]
pub struct DefinitionRegistry {
    inner: Arc<RwLock<HashMap<String, ScraperDefinition>>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a registry from a JSON array of definitions, validating
    /// each entry.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScrapeError> {
        let registry = Self::new();
        registry.load_file(path)?;
        Ok(registry)
    }

    /// Insert or replace under the definition's slug. Replacement is
    /// whole: the previous definition is gone, not merged. Returns the
    /// slug the definition is now reachable under.
    pub fn upsert(&self, definition: ScraperDefinition) -> String {
        let slug = definition.slug();
        self.write_inner().insert(slug.clone(), definition);
        slug
    }

    pub fn get(&self, slug: &str) -> Option<ScraperDefinition> {
        self.read_inner().get(slug).cloned()
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.read_inner().contains_key(slug)
    }

    pub fn len(&self) -> usize {
        self.read_inner().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_inner().is_empty()
    }

    /// Consistent copy of every definition, ordered by slug so runs
    /// over the same registry fan out in a stable order.
    pub fn snapshot(&self) -> Vec<ScraperDefinition> {
        let inner = self.read_inner();
        let mut slugs: Vec<&String> = inner.keys().collect();
        slugs.sort_unstable();
        slugs
            .into_iter()
            .filter_map(|slug| inner.get(slug).cloned())
            .collect()
    }

    /// Load definitions from a JSON file (an array of definitions),
    /// validating and upserting each. Returns how many were loaded.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize, ScrapeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        let definitions: Vec<ScraperDefinition> = serde_json::from_str(&raw)?;
        for definition in &definitions {
            definition.validate().map_err(|e| {
                ScrapeError::InvalidDefinition(format!(
                    "{} in {}: {e}",
                    definition.name,
                    path.display()
                ))
            })?;
        }
        let count = definitions.len();
        for definition in definitions {
            self.upsert(definition);
        }
        tracing::info!(%count, path = %path.display(), "Loaded scraper definitions");
        Ok(count)
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, HashMap<String, ScraperDefinition>> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Definition registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, HashMap<String, ScraperDefinition>> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Definition registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_test_definition;
    use std::io::Write;

    #[test]
    fn test_upsert_then_get_by_slug() {
        let registry = DefinitionRegistry::new();
        let slug = registry.upsert(make_test_definition(
            "Bounos Propiedades",
            "https://bounos.example.com/props",
        ));

        assert_eq!(slug, "bounospropiedades");
        let found = registry.get("bounospropiedades").unwrap();
        assert_eq!(found.name, "Bounos Propiedades");
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_reupsert_replaces_the_whole_definition() {
        let registry = DefinitionRegistry::new();
        registry.upsert(make_test_definition("acme", "https://old.example.com/a"));

        let mut updated = make_test_definition("acme", "https://new.example.com/b");
        updated.root_selector = ".card".into();
        registry.upsert(updated);

        assert_eq!(registry.len(), 1);
        let found = registry.get("acme").unwrap();
        assert_eq!(found.base_url, "https://new.example.com/b");
        assert_eq!(found.root_selector, ".card");
    }

    #[test]
    fn test_snapshot_is_sorted_and_isolated() {
        let registry = DefinitionRegistry::new();
        registry.upsert(make_test_definition("zeta", "https://z.example.com/l"));
        registry.upsert(make_test_definition("alpha", "https://a.example.com/l"));

        let snapshot = registry.snapshot();
        registry.upsert(make_test_definition("mid", "https://m.example.com/l"));

        let names: Vec<_> = snapshot.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_load_file_seeds_valid_definitions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = serde_json::json!([
            {
                "name": "Mallemacci",
                "baseUrl": "https://mallemaci.example.com/listing",
                "rootSelector": ".thumbnail_one",
                "fieldMappings": {"title": ".thum_title h5 a"}
            },
            {
                "name": "Bounos",
                "baseUrl": "https://bounos.example.com/props",
                "rootSelector": "article.item",
                "fieldMappings": {"title": "h2"},
                "pagination": {
                    "enabled": true,
                    "type": "url",
                    "urlTemplate": "https://bounos.example.com/props/{{PAGE}}",
                    "maxPages": 3
                }
            }
        ]);
        write!(file, "{body}").unwrap();

        let registry = DefinitionRegistry::from_file(file.path()).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("mallemacci"));
        assert_eq!(registry.get("bounos").unwrap().pagination.max_pages, 3);
    }

    #[test]
    fn test_load_file_rejects_invalid_entries_with_context() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = serde_json::json!([
            {
                "name": "broken",
                "baseUrl": "not a url",
                "rootSelector": ".x",
                "fieldMappings": {"title": ".t"}
            }
        ]);
        write!(file, "{body}").unwrap();

        let registry = DefinitionRegistry::new();
        let error = registry.load_file(file.path()).unwrap_err();

        assert!(matches!(error, ScrapeError::InvalidDefinition(_)));
        assert!(error.to_string().contains("broken"));
        assert_eq!(registry.len(), 0, "nothing is loaded from a bad file");
    }

    #[test]
    fn test_load_file_missing_path_is_a_config_error() {
        let registry = DefinitionRegistry::new();
        let error = registry.load_file("/nonexistent/defs.json").unwrap_err();
        assert!(matches!(error, ScrapeError::ConfigError(_)));
    }
}
