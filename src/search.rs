//! `kb search`: filter entries by text, category, tag and product.

use anyhow::Result;

use support_kb_core::search::SearchFilter;
use support_kb_core::store::Store;

use crate::config::Config;
use crate::entries::print_entry;
use crate::sqlite_store::SqliteStore;

/// Build a filter from the CLI arguments. A missing or blank query with no
/// other filter lists everything.
pub fn build_filter(
    query: Option<String>,
    category: Option<String>,
    tag: Option<String>,
    product: Option<String>,
) -> SearchFilter {
    SearchFilter {
        query,
        category,
        tag,
        product,
    }
}

pub async fn run_search(
    config: &Config,
    filter: SearchFilter,
    limit: Option<usize>,
    detailed: bool,
) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = store.search(&filter, limit).await;
    store.close().await;

    let hits = result?;
    tracing::debug!(hits = hits.len(), ?filter, "search finished");

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("Found {} entries:", hits.len());
    for entry in &hits {
        print_entry(entry, detailed);
    }
    Ok(())
}
