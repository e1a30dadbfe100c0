//! Substring and exact-match filtering over entries.
//!
//! Search here is a filter, not a ranker: every matching entry is returned,
//! ordered newest-first by `updated_at` with ties broken by descending id.
//!
//! | Filter | Match rule |
//! |--------|------------|
//! | `query` | case-insensitive substring of title, problem, solution, category, code examples, or any single tag |
//! | `category` | case-insensitive equality with the entry's category |
//! | `tag` | case-insensitive equality with one of the entry's tags |
//! | `product` | case-insensitive equality with the entry's product |
//!
//! Filters combine with AND. An empty filter matches everything.

use serde::Deserialize;

use crate::models::KnowledgeEntry;

/// Search criteria. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchFilter {
    pub query: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub product: Option<String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// True when no filter is active, in which case search equals a listing.
    pub fn is_empty(&self) -> bool {
        non_blank(&self.query).is_none()
            && non_blank(&self.category).is_none()
            && non_blank(&self.tag).is_none()
            && non_blank(&self.product).is_none()
    }

    pub fn matches(&self, entry: &KnowledgeEntry) -> bool {
        if let Some(q) = non_blank(&self.query) {
            let q = q.to_lowercase();
            let in_text = [&entry.title, &entry.problem, &entry.solution, &entry.category]
                .iter()
                .any(|field| field.to_lowercase().contains(&q));
            let in_code = entry
                .code_examples
                .as_deref()
                .is_some_and(|code| code.to_lowercase().contains(&q));
            let in_tags = entry.tags.iter().any(|t| t.to_lowercase().contains(&q));
            if !in_text && !in_code && !in_tags {
                return false;
            }
        }

        if let Some(c) = non_blank(&self.category) {
            if entry.category.to_lowercase() != c.to_lowercase() {
                return false;
            }
        }

        if let Some(t) = non_blank(&self.tag) {
            if !entry.has_tag(t) {
                return false;
            }
        }

        if let Some(p) = non_blank(&self.product) {
            let wanted = p.to_lowercase();
            if entry.product.as_deref().map(str::to_lowercase) != Some(wanted) {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Sort entries by `updated_at` descending, then id descending.
pub fn sort_newest_first(entries: &mut [KnowledgeEntry]) {
    entries.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Apply `filter` to a scanned entry set and return ordered, truncated results.
pub fn filter_entries(
    entries: Vec<KnowledgeEntry>,
    filter: &SearchFilter,
    limit: Option<usize>,
) -> Vec<KnowledgeEntry> {
    let mut matched: Vec<KnowledgeEntry> =
        entries.into_iter().filter(|e| filter.matches(e)).collect();
    sort_newest_first(&mut matched);
    if let Some(limit) = limit {
        matched.truncate(limit);
    }
    matched
}
