//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Entries live in a `BTreeMap` behind a `Mutex`. Ids come from a counter
//! that is never rewound, so ids stay unique even after a replace import.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{KbError, Result};
use crate::models::{
    next_updated_at, now, EntryPatch, KnowledgeEntry, NewEntry, UsageInput, UsageRecord,
};
use crate::search::sort_newest_first;
use crate::transfer::{ImportMode, ImportedEntry};

use super::Store;

#[derive(Default)]
struct Inner {
    entries: BTreeMap<i64, KnowledgeEntry>,
    usage: Vec<UsageRecord>,
    last_id: i64,
    last_usage_id: i64,
}

impl Inner {
    fn insert(&mut self, entry: &NewEntry, stamp: Stamp) -> i64 {
        self.last_id += 1;
        let id = self.last_id;
        self.entries.insert(
            id,
            entry.to_entry(id, stamp.created_at, stamp.updated_at, stamp.usage_count),
        );
        id
    }
}

struct Stamp {
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    usage_count: i64,
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| KbError::Storage("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn add(&self, entry: &NewEntry) -> Result<i64> {
        entry.validate()?;
        let ts = now();
        let mut inner = self.lock()?;
        Ok(inner.insert(
            entry,
            Stamp {
                created_at: ts,
                updated_at: ts,
                usage_count: 0,
            },
        ))
    }

    async fn get(&self, id: i64) -> Result<KnowledgeEntry> {
        let inner = self.lock()?;
        inner.entries.get(&id).cloned().ok_or(KbError::NotFound(id))
    }

    async fn update(&self, id: i64, patch: &EntryPatch) -> Result<KnowledgeEntry> {
        let mut inner = self.lock()?;
        let stored = inner.entries.get_mut(&id).ok_or(KbError::NotFound(id))?;

        let mut updated = stored.clone();
        patch.apply(&mut updated)?;
        updated.updated_at = next_updated_at(stored.updated_at, now());

        *stored = updated.clone();
        Ok(updated)
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<KnowledgeEntry>> {
        let inner = self.lock()?;
        let mut entries: Vec<KnowledgeEntry> = inner.entries.values().cloned().collect();
        sort_newest_first(&mut entries);
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    async fn import_entries(&self, entries: &[ImportedEntry], mode: ImportMode) -> Result<usize> {
        for imported in entries {
            imported.entry.validate()?;
        }

        let mut inner = self.lock()?;
        if mode == ImportMode::Replace {
            inner.entries.clear();
            inner.usage.clear();
        }
        for imported in entries {
            inner.insert(
                &imported.entry,
                Stamp {
                    created_at: imported.created_at,
                    updated_at: imported.updated_at,
                    usage_count: imported.usage_count,
                },
            );
        }
        Ok(entries.len())
    }

    async fn record_usage(&self, id: i64, usage: &UsageInput) -> Result<UsageRecord> {
        let mut inner = self.lock()?;
        let entry = inner.entries.get_mut(&id).ok_or(KbError::NotFound(id))?;
        entry.usage_count += 1;

        inner.last_usage_id += 1;
        let record = UsageRecord {
            id: inner.last_usage_id,
            entry_id: id,
            used_at: now(),
            context: usage.context.clone(),
            helpful: usage.helpful,
            notes: usage.notes.clone(),
        };
        inner.usage.push(record.clone());
        Ok(record)
    }

    async fn usage_history(&self, id: i64) -> Result<Vec<UsageRecord>> {
        let inner = self.lock()?;
        let mut history: Vec<UsageRecord> = inner
            .usage
            .iter()
            .filter(|u| u.entry_id == id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.used_at.cmp(&a.used_at).then(b.id.cmp(&a.id)));
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::from_millis;
    use crate::search::SearchFilter;
    use crate::stats;
    use crate::transfer;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .add(&NewEntry::new("Webhook 403 errors", "HMAC mismatch", "Use raw body").with_category("webhooks"))
            .await
            .unwrap();
        store
            .add(&NewEntry::new("Slow bulk export", "Query times out", "Use bulk operations"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_add_then_get_round_trips_content() {
        let store = InMemoryStore::new();
        let id = store
            .add(
                &NewEntry::new("Title", "Problem", "Solution")
                    .with_category("api")
                    .with_tags(["one", "two"]),
            )
            .await
            .unwrap();

        let entry = store.get(id).await.unwrap();
        assert_eq!(entry.title, "Title");
        assert_eq!(entry.problem, "Problem");
        assert_eq!(entry.solution, "Solution");
        assert_eq!(entry.category, "api");
        assert_eq!(entry.tags, vec!["one", "two"]);
        assert_eq!(entry.created_at, entry.updated_at);
        assert_eq!(entry.usage_count, 0);
    }

    #[tokio::test]
    async fn test_add_rejects_blank_fields() {
        let store = InMemoryStore::new();
        let err = store.add(&NewEntry::new("", "p", "s")).await.unwrap_err();
        assert!(matches!(err, KbError::Validation(_)));
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(store.get(9).await, Err(KbError::NotFound(9))));
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let store = seeded().await;
        let before = store.get(1).await.unwrap();

        let after = store
            .update(
                1,
                &EntryPatch {
                    title: Some("Webhook 401 errors".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(after.title, "Webhook 401 errors");
        assert_eq!(after.problem, before.problem);
        assert_eq!(after.solution, before.solution);
        assert_eq!(after.category, before.category);
        assert_eq!(after.tags, before.tags);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
        assert_eq!(store.get(1).await.unwrap(), after);
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.update(3, &EntryPatch::default()).await.unwrap_err();
        assert!(matches!(err, KbError::NotFound(3)));
    }

    #[tokio::test]
    async fn test_update_moves_entry_to_front_of_listing() {
        let store = seeded().await;
        assert_eq!(store.list(None).await.unwrap()[0].id, 2);

        std::thread::sleep(std::time::Duration::from_millis(5));
        store
            .update(1, &EntryPatch { tags: Some(vec!["hmac".into()]), ..Default::default() })
            .await
            .unwrap();
        let ids: Vec<i64> = store.list(None).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_search_by_query_and_category() {
        let store = seeded().await;

        let hits = store.search(&SearchFilter::new().query("webhook"), None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Webhook 403 errors");

        let hits = store.search(&SearchFilter::new().category("GENERAL"), None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Slow bulk export");
    }

    #[tokio::test]
    async fn test_replace_import_assigns_fresh_ids() {
        let store = seeded().await;
        let text = transfer::encode(&store.list(None).await.unwrap(), now()).unwrap();
        let decoded = transfer::decode(&text, now()).unwrap();

        let count = store.import_entries(&decoded, ImportMode::Replace).await.unwrap();
        assert_eq!(count, 2);

        let entries = store.list(None).await.unwrap();
        let mut ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        ids.sort();
        assert_eq!(ids, vec![3, 4]);
        let mut titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["Slow bulk export", "Webhook 403 errors"]);
    }

    #[tokio::test]
    async fn test_merge_import_appends() {
        let store = seeded().await;
        let imported = vec![ImportedEntry {
            entry: NewEntry::new("Imported", "p", "s"),
            created_at: from_millis(1_000),
            updated_at: from_millis(2_000),
            usage_count: 4,
        }];
        store.import_entries(&imported, ImportMode::Merge).await.unwrap();

        let entries = store.list(None).await.unwrap();
        assert_eq!(entries.len(), 3);
        let imported = entries.iter().find(|e| e.title == "Imported").unwrap();
        assert_eq!(imported.id, 3);
        assert_eq!(imported.updated_at, from_millis(2_000));
        assert_eq!(imported.usage_count, 4);
        assert_eq!(imported.category, "general");
    }

    #[tokio::test]
    async fn test_record_usage_bumps_count_without_touching_updated_at() {
        let store = seeded().await;
        let before = store.get(2).await.unwrap();

        let mut usage = UsageInput::new("cli");
        usage.helpful = Some(true);
        let record = store.record_usage(2, &usage).await.unwrap();
        assert_eq!(record.entry_id, 2);
        assert_eq!(record.helpful, Some(true));

        let after = store.get(2).await.unwrap();
        assert_eq!(after.usage_count, 1);
        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(store.usage_history(2).await.unwrap().len(), 1);

        assert!(matches!(
            store.record_usage(99, &usage).await,
            Err(KbError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_usage_history_is_newest_first() {
        let store = seeded().await;
        for note in ["first", "second"] {
            let usage = UsageInput {
                context: "cli".into(),
                helpful: Some(true),
                notes: Some(note.into()),
            };
            store.record_usage(1, &usage).await.unwrap();
        }

        let history = store.usage_history(1).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].notes.as_deref(), Some("second"));
        assert!(store.usage_history(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_over_store() {
        let store = InMemoryStore::new();
        for category in ["api", "api", "general"] {
            store
                .add(&NewEntry::new("t", "p", "s").with_category(category))
                .await
                .unwrap();
        }
        let stats = stats::collect(&store, now()).await.unwrap();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.per_category_counts["api"], 2);
        assert_eq!(stats.recent_additions, 3);
    }
}
