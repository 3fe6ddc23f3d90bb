//! In-memory catalog of templates.

use std::collections::HashMap;

use crate::filter;
use crate::model::Template;

/// Ordered template list plus an identifier index.
///
/// The cache is only ever replaced wholesale; there is no eviction and no
/// per-entry mutation.
#[derive(Clone, Debug, Default)]
pub struct CatalogCache {
    templates: Vec<Template>,
    index: HashMap<String, usize>,
}

impl CatalogCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly fetched list. Later duplicates of an id are dropped.
    pub fn replace(&mut self, templates: Vec<Template>) {
        let mut index = HashMap::with_capacity(templates.len());
        let mut kept = Vec::with_capacity(templates.len());
        for template in templates {
            if index.contains_key(&template.id) {
                tracing::warn!(template_id = %template.id, "duplicate template in catalog");
                continue;
            }
            index.insert(template.id.clone(), kept.len());
            kept.push(template);
        }
        self.templates = kept;
        self.index = index;
    }

    /// Cached entry for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.index.get(id).and_then(|&pos| self.templates.get(pos))
    }

    /// All entries in server order.
    #[must_use]
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Categories offered to the filter UI.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        filter::categories(&self.templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: &str, name: &str) -> Template {
        Template {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            thumbnail_url: None,
            category: None,
        }
    }

    #[test]
    fn replace_swaps_everything() {
        let mut cache = CatalogCache::new();
        cache.replace(vec![template("1", "a"), template("2", "b")]);
        assert_eq!(cache.len(), 2);

        cache.replace(vec![template("3", "c")]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("1").is_none());
        assert_eq!(cache.get("3").map(|t| t.name.as_str()), Some("c"));
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let mut cache = CatalogCache::new();
        cache.replace(vec![template("1", "first"), template("1", "second")]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1").map(|t| t.name.as_str()), Some("first"));
    }

    #[test]
    fn empty_cache_reports_empty() {
        let cache = CatalogCache::new();
        assert!(cache.is_empty());
        assert!(cache.categories().is_empty());
    }
}
