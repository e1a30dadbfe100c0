//! Aggregate counts over the entry set.
//!
//! Stats are recomputed from a full scan on every call. Categories and tags
//! are grouped by their lowercase form, which is also the displayed name.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::KnowledgeEntry;
use crate::store::Store;

/// Window for `recent_additions`.
pub const RECENT_WINDOW_DAYS: i64 = 7;
/// Maximum length of `most_used`.
pub const MOST_USED_LIMIT: usize = 5;

/// A label with the number of entries carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub name: String,
    pub count: usize,
}

/// An entry summary for the most-used ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub id: i64,
    pub title: String,
    pub usage_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_count: usize,
    pub per_category_counts: BTreeMap<String, usize>,
    pub per_tag_counts: BTreeMap<String, usize>,
    /// Categories by count desc, then name asc.
    pub category_list: Vec<LabelCount>,
    /// Tags by count desc, then name asc.
    pub tag_list: Vec<LabelCount>,
    pub most_used: Vec<UsageSummary>,
    /// Entries created within the last [`RECENT_WINDOW_DAYS`] days.
    pub recent_additions: usize,
}

/// Compute stats for `entries` as of `now`.
pub fn compute(entries: &[KnowledgeEntry], now: DateTime<Utc>) -> Stats {
    let mut per_category_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut per_tag_counts: BTreeMap<String, usize> = BTreeMap::new();

    for entry in entries {
        *per_category_counts
            .entry(entry.category.to_lowercase())
            .or_insert(0) += 1;

        let distinct: BTreeSet<String> = entry.tags.iter().map(|t| t.to_lowercase()).collect();
        for tag in distinct {
            *per_tag_counts.entry(tag).or_insert(0) += 1;
        }
    }

    let cutoff = now - TimeDelta::days(RECENT_WINDOW_DAYS);
    let recent_additions = entries.iter().filter(|e| e.created_at > cutoff).count();

    let mut used: Vec<&KnowledgeEntry> = entries.iter().filter(|e| e.usage_count > 0).collect();
    used.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then_with(|| a.id.cmp(&b.id)));
    let most_used = used
        .into_iter()
        .take(MOST_USED_LIMIT)
        .map(|e| UsageSummary {
            id: e.id,
            title: e.title.clone(),
            usage_count: e.usage_count,
        })
        .collect();

    Stats {
        total_count: entries.len(),
        category_list: ranked(&per_category_counts),
        tag_list: ranked(&per_tag_counts),
        per_category_counts,
        per_tag_counts,
        most_used,
        recent_additions,
    }
}

/// Scan `store` and compute stats as of `now`.
pub async fn collect<S: Store + ?Sized>(store: &S, now: DateTime<Utc>) -> Result<Stats> {
    let entries = store.list(None).await?;
    Ok(compute(&entries, now))
}

fn ranked(counts: &BTreeMap<String, usize>) -> Vec<LabelCount> {
    let mut list: Vec<LabelCount> = counts
        .iter()
        .map(|(name, count)| LabelCount {
            name: name.clone(),
            count: *count,
        })
        .collect();
    list.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::from_millis;

    const DAY_MS: i64 = 86_400_000;
    const NOW_MS: i64 = 100 * DAY_MS;

    fn entry(id: i64, category: &str, tags: &[&str], created_ms: i64, usage: i64) -> KnowledgeEntry {
        KnowledgeEntry {
            id,
            title: format!("entry {}", id),
            problem: "p".into(),
            solution: "s".into(),
            category: category.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            product: None,
            api_version: None,
            code_examples: None,
            notes: None,
            created_at: from_millis(created_ms),
            updated_at: from_millis(created_ms),
            usage_count: usage,
        }
    }

    #[test]
    fn test_empty_stats() {
        let stats = compute(&[], from_millis(NOW_MS));
        assert_eq!(stats.total_count, 0);
        assert!(stats.per_category_counts.is_empty());
        assert!(stats.per_tag_counts.is_empty());
        assert!(stats.category_list.is_empty());
        assert!(stats.tag_list.is_empty());
        assert!(stats.most_used.is_empty());
        assert_eq!(stats.recent_additions, 0);
    }

    #[test]
    fn test_category_counts() {
        let entries = vec![
            entry(1, "api", &[], NOW_MS, 0),
            entry(2, "api", &[], NOW_MS, 0),
            entry(3, "general", &[], NOW_MS, 0),
        ];
        let stats = compute(&entries, from_millis(NOW_MS));
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.per_category_counts["api"], 2);
        assert_eq!(stats.per_category_counts["general"], 1);
        assert_eq!(stats.category_list[0], LabelCount { name: "api".into(), count: 2 });
    }

    #[test]
    fn test_categories_grouped_case_insensitively() {
        let entries = vec![entry(1, "API", &[], NOW_MS, 0), entry(2, "api", &[], NOW_MS, 0)];
        let stats = compute(&entries, from_millis(NOW_MS));
        assert_eq!(stats.per_category_counts.len(), 1);
        assert_eq!(stats.per_category_counts["api"], 2);
    }

    #[test]
    fn test_tag_counts_count_entries_not_occurrences() {
        let entries = vec![
            entry(1, "general", &["hmac", "HMAC", "403"], NOW_MS, 0),
            entry(2, "general", &["hmac"], NOW_MS, 0),
        ];
        let stats = compute(&entries, from_millis(NOW_MS));
        assert_eq!(stats.per_tag_counts["hmac"], 2);
        assert_eq!(stats.per_tag_counts["403"], 1);
        let names: Vec<&str> = stats.tag_list.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["hmac", "403"]);
    }

    #[test]
    fn test_ranked_list_breaks_ties_by_name() {
        let entries = vec![
            entry(1, "zeta", &[], NOW_MS, 0),
            entry(2, "alpha", &[], NOW_MS, 0),
        ];
        let stats = compute(&entries, from_millis(NOW_MS));
        let names: Vec<&str> = stats.category_list.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_recent_additions_window() {
        let entries = vec![
            entry(1, "general", &[], NOW_MS - DAY_MS, 0),
            entry(2, "general", &[], NOW_MS - 8 * DAY_MS, 0),
        ];
        let stats = compute(&entries, from_millis(NOW_MS));
        assert_eq!(stats.recent_additions, 1);
    }

    #[test]
    fn test_most_used_ordering_and_limit() {
        let entries: Vec<KnowledgeEntry> = (1..=7)
            .map(|id| entry(id, "general", &[], NOW_MS, if id == 7 { 0 } else { id % 3 + 1 }))
            .collect();
        let stats = compute(&entries, from_millis(NOW_MS));
        assert_eq!(stats.most_used.len(), MOST_USED_LIMIT);
        let ids: Vec<i64> = stats.most_used.iter().map(|u| u.id).collect();
        // usage: 1->2, 2->3, 3->1, 4->2, 5->3, 6->1, 7->0
        assert_eq!(ids, vec![2, 5, 1, 4, 3]);
    }
}
