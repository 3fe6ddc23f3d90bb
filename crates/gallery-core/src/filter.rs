//! Pure catalog queries.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::Template;

/// Text and category predicates applied to the catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateQuery {
    /// Case-insensitive substring matched against name and description, as typed.
    pub text: String,
    /// Category matched case-insensitively after trimming.
    pub category: String,
}

impl TemplateQuery {
    /// Query from optional CLI/UI inputs.
    #[must_use]
    pub fn new(text: Option<&str>, category: Option<&str>) -> Self {
        Self {
            text: text.unwrap_or_default().to_string(),
            category: category.unwrap_or_default().to_string(),
        }
    }

    /// Whether both predicates are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.category.trim().is_empty()
    }

    /// Whether `template` satisfies both predicates.
    #[must_use]
    pub fn matches(&self, template: &Template) -> bool {
        self.matches_text(template) && self.matches_category(template)
    }

    fn matches_text(&self, template: &Template) -> bool {
        let needle = self.text.to_lowercase();
        needle.is_empty()
            || template.name.to_lowercase().contains(&needle)
            || template.description.to_lowercase().contains(&needle)
    }

    fn matches_category(&self, template: &Template) -> bool {
        let wanted = self.category.trim();
        if wanted.is_empty() {
            return true;
        }
        template
            .category_label()
            .is_some_and(|category| category.to_lowercase() == wanted.to_lowercase())
    }
}

/// Ordered subsequence of `templates` matching `query`.
#[must_use]
pub fn filter_templates(templates: &[Template], query: &TemplateQuery) -> Vec<Template> {
    templates
        .iter()
        .filter(|template| query.matches(template))
        .cloned()
        .collect()
}

/// Distinct, trimmed, non-empty categories in ascending order.
#[must_use]
pub fn categories(templates: &[Template]) -> Vec<String> {
    templates
        .iter()
        .filter_map(Template::category_label)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// "Showing N of M templates" counts for a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    /// Templates left after filtering.
    pub shown: usize,
    /// Templates in the catalog.
    pub total: usize,
}

impl FilterSummary {
    /// Human-readable summary line.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("Showing {} of {} templates", self.shown, self.total)
    }
}
