//! Entry commands: `kb add`, `kb show`, `kb edit`, `kb list`, `kb use`.
//!
//! Each command opens the store, performs one operation, prints a
//! human-readable result to stdout and closes the pool.

use anyhow::Result;

use support_kb_core::models::{
    parse_tags, EntryPatch, KnowledgeEntry, NewEntry, UsageInput, UsageRecord,
};
use support_kb_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Content fields accepted by `kb edit`. Tags arrive comma-joined.
#[derive(Debug, Default)]
pub struct EditArgs {
    pub title: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub product: Option<String>,
    pub api_version: Option<String>,
    pub code_examples: Option<String>,
    pub notes: Option<String>,
}

/// Optional fields accepted by `kb add`.
#[derive(Debug, Default)]
pub struct Extras {
    pub category: Option<String>,
    pub tags: Option<String>,
    pub product: Option<String>,
    pub api_version: Option<String>,
    pub code_examples: Option<String>,
    pub notes: Option<String>,
}

/// How many usage notes `kb show` prints.
const RECENT_NOTES: usize = 5;

impl EditArgs {
    pub fn into_patch(self) -> EntryPatch {
        EntryPatch {
            title: self.title,
            problem: self.problem,
            solution: self.solution,
            category: self.category,
            tags: self.tags.as_deref().map(parse_tags),
            product: self.product,
            api_version: self.api_version,
            code_examples: self.code_examples,
            notes: self.notes,
        }
    }
}

pub async fn run_add(
    config: &Config,
    title: String,
    problem: String,
    solution: String,
    extras: Extras,
) -> Result<()> {
    let entry = NewEntry {
        title,
        problem,
        solution,
        category: extras.category,
        tags: extras.tags.as_deref().map(parse_tags).unwrap_or_default(),
        product: extras.product,
        api_version: extras.api_version,
        code_examples: extras.code_examples,
        notes: extras.notes,
    };

    let store = SqliteStore::open(config).await?;
    let result = store.add(&entry).await;
    store.close().await;

    let id = result?;
    println!("Entry added. id: {}", id);
    Ok(())
}

pub async fn run_show(config: &Config, id: i64) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = store.get(id).await;
    let history = match &result {
        Ok(_) => store.usage_history(id).await,
        Err(_) => Ok(Vec::new()),
    };
    store.close().await;

    let entry = result?;
    print_entry(&entry, true);

    let history = history?;
    let helpful = history.iter().filter(|u| u.helpful == Some(true)).count();
    println!("usage:      {} times ({} helpful)", entry.usage_count, helpful);

    let notes = recent_notes(&history, RECENT_NOTES);
    if !notes.is_empty() {
        println!();
        println!("--- Recent usage notes ---");
        for usage in notes {
            println!(
                "{} [{}] {}",
                format_ts(usage.used_at),
                usage.context,
                usage.notes.as_deref().unwrap_or_default()
            );
        }
    }
    Ok(())
}

/// The newest `limit` usage records that carry a non-blank note.
/// `history` is expected newest first.
pub fn recent_notes(history: &[UsageRecord], limit: usize) -> Vec<&UsageRecord> {
    history
        .iter()
        .filter(|u| u.notes.as_deref().is_some_and(|n| !n.trim().is_empty()))
        .take(limit)
        .collect()
}

pub async fn run_edit(config: &Config, id: i64, args: EditArgs) -> Result<()> {
    let patch = args.into_patch();
    if patch.is_empty() {
        anyhow::bail!(support_kb_core::KbError::Validation(
            "nothing to change: pass at least one of --title, --problem, --solution, \
             --category, --tags, --product, --api-version, --code, --notes"
                .to_string()
        ));
    }

    let store = SqliteStore::open(config).await?;
    let result = store.update(id, &patch).await;
    store.close().await;

    let entry = result?;
    println!("Entry {} updated.", entry.id);
    print_entry(&entry, false);
    Ok(())
}

pub async fn run_list(config: &Config, limit: Option<usize>, detailed: bool) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = store.list(limit).await;
    store.close().await;

    let entries = result?;
    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    println!("Showing {} entries:", entries.len());
    for entry in &entries {
        print_entry(entry, detailed);
    }
    Ok(())
}

pub async fn run_use(
    config: &Config,
    id: i64,
    helpful: Option<bool>,
    notes: Option<String>,
) -> Result<()> {
    let usage = UsageInput {
        context: "cli".to_string(),
        helpful,
        notes,
    };

    let store = SqliteStore::open(config).await?;
    let result = store.record_usage(id, &usage).await;
    store.close().await;

    result?;
    println!("Usage recorded for entry {}.", id);
    Ok(())
}

/// Print one entry. The detailed form includes problem, solution and timestamps.
pub fn print_entry(entry: &KnowledgeEntry, detailed: bool) {
    println!();
    println!("[{}] {}", entry.id, entry.title);
    println!("category:   {}", entry.category);
    if !entry.tags.is_empty() {
        println!("tags:       {}", entry.tags.join(", "));
    }
    if let Some(product) = &entry.product {
        println!("product:    {}", product);
    }
    if let Some(api_version) = &entry.api_version {
        println!("api:        {}", api_version);
    }

    if detailed {
        println!("created_at: {}", format_ts(entry.created_at));
        println!("updated_at: {}", format_ts(entry.updated_at));
        println!();
        println!("--- Problem ---");
        println!("{}", entry.problem);
        println!();
        println!("--- Solution ---");
        println!("{}", entry.solution);
        println!();
        if let Some(code) = &entry.code_examples {
            println!("--- Code ---");
            println!("{}", code);
            println!();
        }
        if let Some(notes) = &entry.notes {
            println!("--- Notes ---");
            println!("{}", notes);
            println!();
        }
    }
    println!("{}", "-".repeat(50));
}

pub fn format_ts(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
