//! Storage abstraction for the knowledge base.
//!
//! The [`Store`] trait is the contract every backend satisfies: the SQLite
//! store in the application crate and the [`memory::InMemoryStore`] used in
//! tests. The store exclusively owns entry ids, timestamps and usage counts;
//! callers only supply content.
//!
//! Implementations must be `Send + Sync` to be shared across request handlers.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{EntryPatch, KnowledgeEntry, NewEntry, UsageInput, UsageRecord};
use crate::search::{filter_entries, SearchFilter};
use crate::transfer::{ImportMode, ImportedEntry};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`initialize`](Store::initialize) | Ensure the schema exists (idempotent) |
/// | [`add`](Store::add) | Validate and insert a new entry, returning its id |
/// | [`get`](Store::get) | Fetch one entry or fail with `NotFound` |
/// | [`update`](Store::update) | Apply a partial update and refresh `updated_at` |
/// | [`list`](Store::list) | All entries, newest first |
/// | [`search`](Store::search) | Filtered entries, newest first |
/// | [`import_entries`](Store::import_entries) | Bulk insert in merge or replace mode |
/// | [`record_usage`](Store::record_usage) | Log a use and bump `usage_count` |
/// | [`usage_history`](Store::usage_history) | Usage events for one entry |
///
/// Every mutating call is durable when it returns.
#[async_trait]
pub trait Store: Send + Sync {
    async fn initialize(&self) -> Result<()>;

    /// Fails with `Validation` when title, problem or solution is blank.
    async fn add(&self, entry: &NewEntry) -> Result<i64>;

    async fn get(&self, id: i64) -> Result<KnowledgeEntry>;

    /// Fails with `NotFound` for an unknown id and `Validation` when a
    /// supplied required field is blank.
    async fn update(&self, id: i64, patch: &EntryPatch) -> Result<KnowledgeEntry>;

    /// Entries ordered by `updated_at` descending, ties by id descending.
    async fn list(&self, limit: Option<usize>) -> Result<Vec<KnowledgeEntry>>;

    /// Filtered entries with the same ordering as [`list`](Store::list).
    ///
    /// The default scans the full listing and applies [`SearchFilter::matches`].
    async fn search(
        &self,
        filter: &SearchFilter,
        limit: Option<usize>,
    ) -> Result<Vec<KnowledgeEntry>> {
        if filter.is_empty() {
            return self.list(limit).await;
        }
        let entries = self.list(None).await?;
        Ok(filter_entries(entries, filter, limit))
    }

    /// Insert every entry with a fresh id. In [`ImportMode::Replace`] all
    /// existing entries are removed first, as part of the same transaction.
    async fn import_entries(&self, entries: &[ImportedEntry], mode: ImportMode) -> Result<usize>;

    /// Fails with `NotFound` for an unknown id. Does not touch `updated_at`.
    async fn record_usage(&self, id: i64, usage: &UsageInput) -> Result<UsageRecord>;

    /// Usage events for one entry ordered by `used_at` descending, ties by id
    /// descending. An unknown id yields an empty list.
    async fn usage_history(&self, id: i64) -> Result<Vec<UsageRecord>>;
}
