//! SQLite-backed [`Store`] implementation.
//!
//! Timestamps are stored as integer Unix milliseconds and tags as the
//! comma-joined string. Multi-statement operations (update, import,
//! usage recording) run inside a single transaction.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use support_kb_core::error::{KbError, Result};
use support_kb_core::models::{
    from_millis, next_updated_at, now, parse_tags, EntryPatch, KnowledgeEntry, NewEntry,
    UsageInput, UsageRecord,
};
use support_kb_core::store::Store;
use support_kb_core::transfer::{ImportMode, ImportedEntry};

use crate::config::Config;
use crate::{db, migrate};

const ENTRY_COLUMNS: &str = "id, title, problem, solution, category, tags, product, \
     api_version, code_examples, notes, created_at, updated_at, usage_count";

/// SQLite implementation of the [`Store`] trait.
///
/// Wraps a [`SqlitePool`] that is opened once and shared by every caller.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        let store = Self::new(pool);
        store.initialize().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn storage(err: sqlx::Error) -> KbError {
    KbError::Storage(err.to_string())
}

fn row_to_entry(row: &SqliteRow) -> Result<KnowledgeEntry> {
    let tags: String = row.try_get("tags").map_err(storage)?;
    Ok(KnowledgeEntry {
        id: row.try_get("id").map_err(storage)?,
        title: row.try_get("title").map_err(storage)?,
        problem: row.try_get("problem").map_err(storage)?,
        solution: row.try_get("solution").map_err(storage)?,
        category: row.try_get("category").map_err(storage)?,
        tags: parse_tags(&tags),
        product: row.try_get("product").map_err(storage)?,
        api_version: row.try_get("api_version").map_err(storage)?,
        code_examples: row.try_get("code_examples").map_err(storage)?,
        notes: row.try_get("notes").map_err(storage)?,
        created_at: from_millis(row.try_get("created_at").map_err(storage)?),
        updated_at: from_millis(row.try_get("updated_at").map_err(storage)?),
        usage_count: row.try_get("usage_count").map_err(storage)?,
    })
}

fn row_to_usage(row: &SqliteRow) -> Result<UsageRecord> {
    Ok(UsageRecord {
        id: row.try_get("id").map_err(storage)?,
        entry_id: row.try_get("entry_id").map_err(storage)?,
        used_at: from_millis(row.try_get("used_at").map_err(storage)?),
        context: row.try_get("context").map_err(storage)?,
        helpful: row.try_get("helpful").map_err(storage)?,
        notes: row.try_get("notes").map_err(storage)?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn initialize(&self) -> Result<()> {
        migrate::run_migrations(&self.pool).await.map_err(storage)
    }

    async fn add(&self, entry: &NewEntry) -> Result<i64> {
        entry.validate()?;
        let ts = now();
        let row = entry.to_entry(0, ts, ts, 0);

        let result = sqlx::query(
            "INSERT INTO entries (title, problem, solution, category, tags, product, api_version, \
             code_examples, notes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.title)
        .bind(&row.problem)
        .bind(&row.solution)
        .bind(&row.category)
        .bind(row.tags_joined())
        .bind(&row.product)
        .bind(&row.api_version)
        .bind(&row.code_examples)
        .bind(&row.notes)
        .bind(ts.timestamp_millis())
        .bind(ts.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        let id = result.last_insert_rowid();
        tracing::info!(id, title = %entry.title, "entry added");
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<KnowledgeEntry> {
        let row = sqlx::query(&format!("SELECT {} FROM entries WHERE id = ?", ENTRY_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match row {
            Some(row) => row_to_entry(&row),
            None => Err(KbError::NotFound(id)),
        }
    }

    async fn update(&self, id: i64, patch: &EntryPatch) -> Result<KnowledgeEntry> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let row = sqlx::query(&format!("SELECT {} FROM entries WHERE id = ?", ENTRY_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?
            .ok_or(KbError::NotFound(id))?;

        let mut entry = row_to_entry(&row)?;
        patch.apply(&mut entry)?;
        entry.updated_at = next_updated_at(entry.updated_at, now());

        sqlx::query(
            "UPDATE entries SET title = ?, problem = ?, solution = ?, category = ?, tags = ?, \
             product = ?, api_version = ?, code_examples = ?, notes = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&entry.title)
        .bind(&entry.problem)
        .bind(&entry.solution)
        .bind(&entry.category)
        .bind(entry.tags_joined())
        .bind(&entry.product)
        .bind(&entry.api_version)
        .bind(&entry.code_examples)
        .bind(&entry.notes)
        .bind(entry.updated_at.timestamp_millis())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

        tracing::info!(id, "entry updated");
        Ok(entry)
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<KnowledgeEntry>> {
        // A negative LIMIT means no limit in SQLite.
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = sqlx::query(&format!(
            "SELECT {} FROM entries ORDER BY updated_at DESC, id DESC LIMIT ?",
            ENTRY_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn import_entries(&self, entries: &[ImportedEntry], mode: ImportMode) -> Result<usize> {
        for imported in entries {
            imported.entry.validate()?;
        }

        let mut tx = self.pool.begin().await.map_err(storage)?;

        if mode == ImportMode::Replace {
            sqlx::query("DELETE FROM entry_usage")
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
            let removed = sqlx::query("DELETE FROM entries")
                .execute(&mut *tx)
                .await
                .map_err(storage)?
                .rows_affected();
            tracing::info!(removed, "cleared entries for replace import");
        }

        for imported in entries {
            let row = imported.entry.to_entry(
                0,
                imported.created_at,
                imported.updated_at,
                imported.usage_count,
            );
            sqlx::query(
                "INSERT INTO entries (title, problem, solution, category, tags, product, \
                 api_version, code_examples, notes, created_at, updated_at, usage_count) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&row.title)
            .bind(&row.problem)
            .bind(&row.solution)
            .bind(&row.category)
            .bind(row.tags_joined())
            .bind(&row.product)
            .bind(&row.api_version)
            .bind(&row.code_examples)
            .bind(&row.notes)
            .bind(row.created_at.timestamp_millis())
            .bind(row.updated_at.timestamp_millis())
            .bind(row.usage_count)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;

        tracing::info!(count = entries.len(), ?mode, "entries imported");
        Ok(entries.len())
    }

    async fn record_usage(&self, id: i64, usage: &UsageInput) -> Result<UsageRecord> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let bumped = sqlx::query("UPDATE entries SET usage_count = usage_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?
            .rows_affected();
        if bumped == 0 {
            return Err(KbError::NotFound(id));
        }

        let used_at = now();
        let result = sqlx::query(
            "INSERT INTO entry_usage (entry_id, used_at, context, helpful, notes) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(used_at.timestamp_millis())
        .bind(&usage.context)
        .bind(usage.helpful)
        .bind(&usage.notes)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

        tracing::info!(id, context = %usage.context, helpful = ?usage.helpful, "usage recorded");
        Ok(UsageRecord {
            id: result.last_insert_rowid(),
            entry_id: id,
            used_at,
            context: usage.context.clone(),
            helpful: usage.helpful,
            notes: usage.notes.clone(),
        })
    }

    async fn usage_history(&self, id: i64) -> Result<Vec<UsageRecord>> {
        let rows = sqlx::query(
            "SELECT id, entry_id, used_at, context, helpful, notes FROM entry_usage \
             WHERE entry_id = ? ORDER BY used_at DESC, id DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_usage).collect()
    }
}
