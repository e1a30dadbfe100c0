//! `kb stats`: knowledge base summary.
//!
//! Prints totals, the category and tag breakdowns, the most-used entries
//! and the number of entries added in the last week.

use anyhow::Result;

use support_kb_core::models::now;
use support_kb_core::stats::{self, LabelCount, Stats, RECENT_WINDOW_DAYS};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = stats::collect(&store, now()).await;
    store.close().await;

    let stats = result?;
    print!("{}", render(&stats, config));
    Ok(())
}

/// Render stats as the plain-text report printed by `kb stats`.
pub fn render(stats: &Stats, config: &Config) -> String {
    let mut out = String::new();
    out.push_str("Support KB Stats\n");
    out.push_str("================\n\n");
    out.push_str(&format!("  Database:    {}\n", config.db.path.display()));
    out.push_str(&format!("  Entries:     {}\n", stats.total_count));
    out.push_str(&format!(
        "  Recent:      {} added in the last {} days\n",
        stats.recent_additions, RECENT_WINDOW_DAYS
    ));

    render_labels(&mut out, "CATEGORY", &stats.category_list);
    render_labels(&mut out, "TAG", &stats.tag_list);

    if !stats.most_used.is_empty() {
        out.push_str("\n  Most used:\n");
        out.push_str(&format!("  {:>6}  {:>5}   {}\n", "ID", "USES", "TITLE"));
        out.push_str(&format!("  {}\n", "-".repeat(50)));
        for item in &stats.most_used {
            out.push_str(&format!(
                "  {:>6}  {:>5}   {}\n",
                item.id, item.usage_count, item.title
            ));
        }
    }

    out.push('\n');
    out
}

fn render_labels(out: &mut String, heading: &str, labels: &[LabelCount]) {
    if labels.is_empty() {
        return;
    }
    out.push('\n');
    out.push_str(&format!("  {:<32} {:>7}\n", heading, "ENTRIES"));
    out.push_str(&format!("  {}\n", "-".repeat(40)));
    for label in labels {
        out.push_str(&format!("  {:<32} {:>7}\n", label.name, label.count));
    }
}
