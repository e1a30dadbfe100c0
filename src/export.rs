//! `kb export`: write every entry to a JSON file.
//!
//! The file is an object with an `exported_at` timestamp and an `entries`
//! array, oldest first, that `kb import` reads back.

use anyhow::{Context, Result};
use std::path::Path;

use support_kb_core::models::now;
use support_kb_core::store::Store;
use support_kb_core::transfer;
use support_kb_core::KbError;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Export all entries from `store` into `path`. Returns the entry count.
pub async fn export_to_file<S: Store + ?Sized>(store: &S, path: &Path) -> Result<usize> {
    let entries = store.list(None).await?;
    let text = transfer::encode(&entries, now())?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KbError::Io(e.to_string()))
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    std::fs::write(path, text)
        .map_err(|e| KbError::Io(e.to_string()))
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;

    tracing::info!(count = entries.len(), path = %path.display(), "export written");
    Ok(entries.len())
}

pub async fn run_export(config: &Config, output: &Path) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = export_to_file(&store, output).await;
    store.close().await;

    let count = result?;
    println!("Exported {} entries to {}", count, output.display());
    Ok(())
}
