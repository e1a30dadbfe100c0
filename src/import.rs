//! `kb import`: load entries from an export file.
//!
//! The file is decoded and validated in full before the store is touched,
//! so a malformed file leaves existing entries as they were.

use anyhow::{Context, Result};
use std::path::Path;

use support_kb_core::models::now;
use support_kb_core::store::Store;
use support_kb_core::transfer::{self, ImportMode};
use support_kb_core::KbError;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Import entries from `path` into `store`. Returns the number imported.
pub async fn import_from_file<S: Store + ?Sized>(
    store: &S,
    path: &Path,
    mode: ImportMode,
) -> Result<usize> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| KbError::Io(e.to_string()))
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;

    let entries = transfer::decode(&text, now())
        .with_context(|| format!("Rejected import file: {}", path.display()))?;

    let count = store.import_entries(&entries, mode).await?;
    Ok(count)
}

pub async fn run_import(config: &Config, input: &Path, mode: ImportMode) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = import_from_file(&store, input, mode).await;
    store.close().await;

    let count = result?;
    let verb = match mode {
        ImportMode::Merge => "Merged",
        ImportMode::Replace => "Replaced knowledge base with",
    };
    println!("{} {} entries from {}", verb, count, input.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use support_kb_core::models::NewEntry;
    use support_kb_core::store::memory::InMemoryStore;

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let store = InMemoryStore::new();
        let err = import_from_file(&store, Path::new("/no/such/export.json"), ImportMode::Merge)
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<KbError>(), Some(KbError::Io(_))));
    }

    #[tokio::test]
    async fn test_malformed_file_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"[{"title": "only a title"}]"#).unwrap();

        let store = InMemoryStore::new();
        store.add(&NewEntry::new("kept", "p", "s")).await.unwrap();

        let err = import_from_file(&store, &path, ImportMode::Replace)
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<KbError>(), Some(KbError::Format(_))));
        assert_eq!(store.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_export_then_import_into_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kb.json");

        let source = InMemoryStore::new();
        source
            .add(&NewEntry::new("A", "pa", "sa").with_tags(["x"]))
            .await
            .unwrap();
        source.add(&NewEntry::new("B", "pb", "sb")).await.unwrap();
        let exported = crate::export::export_to_file(&source, &path).await.unwrap();
        assert_eq!(exported, 2);

        let target = InMemoryStore::new();
        let imported = import_from_file(&target, &path, ImportMode::Merge).await.unwrap();
        assert_eq!(imported, 2);

        let mut titles: Vec<String> = target
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["A", "B"]);
    }
}
