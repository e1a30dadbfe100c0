//! Server-rendered HTML pages for the web interface.
//!
//! Pages are plain `format!` templates wrapped in a shared [`layout`]. All
//! user-supplied text passes through [`escape_html`] before it is embedded,
//! and query-string values through `urlencoding`.

use serde::Deserialize;

use support_kb_core::models::{parse_tags, EntryPatch, KnowledgeEntry, NewEntry, UsageRecord};
use support_kb_core::search::SearchFilter;
use support_kb_core::stats::{LabelCount, Stats, RECENT_WINDOW_DAYS};

use crate::config::SuggestionsConfig;

/// Raw add/edit form submission. Kept as typed so a rejected form can be
/// re-rendered with exactly what the user entered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub code_examples: String,
    #[serde(default)]
    pub notes: String,
}

impl EntryForm {
    pub fn from_entry(entry: &KnowledgeEntry) -> Self {
        Self {
            title: entry.title.clone(),
            problem: entry.problem.clone(),
            solution: entry.solution.clone(),
            category: entry.category.clone(),
            tags: entry.tags.join(", "),
            product: entry.product.clone().unwrap_or_default(),
            api_version: entry.api_version.clone().unwrap_or_default(),
            code_examples: entry.code_examples.clone().unwrap_or_default(),
            notes: entry.notes.clone().unwrap_or_default(),
        }
    }

    pub fn to_new_entry(&self) -> NewEntry {
        NewEntry {
            title: self.title.clone(),
            problem: self.problem.clone(),
            solution: self.solution.clone(),
            category: Some(self.category.clone()),
            tags: parse_tags(&self.tags),
            product: Some(self.product.clone()),
            api_version: Some(self.api_version.clone()),
            code_examples: Some(self.code_examples.clone()),
            notes: Some(self.notes.clone()),
        }
    }

    /// The edit form always submits every field.
    pub fn to_patch(&self) -> EntryPatch {
        EntryPatch {
            title: Some(self.title.clone()),
            problem: Some(self.problem.clone()),
            solution: Some(self.solution.clone()),
            category: Some(self.category.clone()),
            tags: Some(parse_tags(&self.tags)),
            product: Some(self.product.clone()),
            api_version: Some(self.api_version.clone()),
            code_examples: Some(self.code_examples.clone()),
            notes: Some(self.notes.clone()),
        }
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} | Support KB</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem; }}
nav a {{ margin-right: 1rem; }}
.entry {{ border-bottom: 1px solid #ddd; padding: 0.5rem 0; }}
.meta {{ color: #666; font-size: 0.9rem; }}
.tag {{ background: #eef; border-radius: 3px; padding: 0 0.3rem; margin-right: 0.3rem; }}
.error {{ background: #fee; border: 1px solid #c33; padding: 0.5rem; }}
pre {{ white-space: pre-wrap; background: #f7f7f7; padding: 0.5rem; }}
label {{ display: block; margin-top: 0.5rem; }}
input[type=text], textarea {{ width: 100%; }}
</style>
</head>
<body>
<nav><a href="/">Dashboard</a><a href="/entries">Entries</a><a href="/entries/new">Add entry</a><a href="/stats">Stats</a></nav>
<form action="/search" method="get"><input type="text" name="q" placeholder="Search problems and solutions"></form>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
        body = body
    )
}

fn search_link(key: &str, value: &str) -> String {
    format!("/search?{}={}", key, urlencoding::encode(value))
}

fn render_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| {
            format!(
                r#"<a class="tag" href="{}">{}</a>"#,
                search_link("tag", t),
                escape_html(t)
            )
        })
        .collect::<Vec<_>>()
        .join("")
}

fn render_summary(entry: &KnowledgeEntry) -> String {
    format!(
        r#"<div class="entry"><a href="/entries/{id}"><strong>{title}</strong></a>
<div class="meta"><a href="{cat_link}">{category}</a> · updated {updated} · used {uses}x</div>
<div>{tags}</div></div>
"#,
        id = entry.id,
        title = escape_html(&entry.title),
        cat_link = search_link("category", &entry.category),
        category = escape_html(&entry.category),
        updated = entry.updated_at.format("%Y-%m-%d %H:%M"),
        uses = entry.usage_count,
        tags = render_tags(&entry.tags),
    )
}

fn render_list(entries: &[KnowledgeEntry], empty: &str) -> String {
    if entries.is_empty() {
        return format!("<p>{}</p>", escape_html(empty));
    }
    entries.iter().map(render_summary).collect()
}

fn render_label_links(key: &str, labels: &[LabelCount]) -> String {
    if labels.is_empty() {
        return "<p>None yet.</p>".to_string();
    }
    let items: String = labels
        .iter()
        .map(|l| {
            format!(
                r#"<li><a href="{}">{}</a> ({})</li>"#,
                search_link(key, &l.name),
                escape_html(&l.name),
                l.count
            )
        })
        .collect();
    format!("<ul>{}</ul>", items)
}

pub fn dashboard(stats: &Stats, recent: &[KnowledgeEntry]) -> String {
    let cloud: String = stats
        .tag_list
        .iter()
        .map(|t| {
            format!(
                r#"<a class="tag" href="{}">{} ({})</a>"#,
                search_link("tag", &t.name),
                escape_html(&t.name),
                t.count
            )
        })
        .collect();

    let body = format!(
        r#"<h1>Support Knowledge Base</h1>
<p>{total} entries across {cats} categories. {recent_count} added in the last {days} days.</p>
<h2>Recently updated</h2>
{recent}
<h2>Tags</h2>
<p>{cloud}</p>
"#,
        total = stats.total_count,
        cats = stats.category_list.len(),
        recent_count = stats.recent_additions,
        days = RECENT_WINDOW_DAYS,
        recent = render_list(recent, "No entries yet. Add the first one."),
        cloud = if cloud.is_empty() { "No tags yet.".to_string() } else { cloud },
    );
    layout("Dashboard", &body)
}

pub fn entry_list(entries: &[KnowledgeEntry]) -> String {
    let body = format!(
        "<h1>All entries ({})</h1>\n{}",
        entries.len(),
        render_list(entries, "No entries yet.")
    );
    layout("Entries", &body)
}

fn render_optional_section(heading: &str, value: Option<&str>) -> String {
    value
        .map(|v| format!("<h2>{}</h2>\n<pre>{}</pre>\n", heading, escape_html(v)))
        .unwrap_or_default()
}

fn render_usage_notes(history: &[UsageRecord]) -> String {
    let items: String = history
        .iter()
        .filter_map(|u| {
            let notes = u.notes.as_deref().filter(|n| !n.trim().is_empty())?;
            Some(format!(
                r#"<li><span class="meta">{} · {}</span> {}</li>"#,
                u.used_at.format("%Y-%m-%d %H:%M"),
                escape_html(&u.context),
                escape_html(notes)
            ))
        })
        .collect();
    if items.is_empty() {
        return String::new();
    }
    format!("<h2>Usage notes</h2>\n<ul>{}</ul>\n", items)
}

/// Entry page. `history` is the entry's usage, newest first.
pub fn entry_detail(entry: &KnowledgeEntry, history: &[UsageRecord]) -> String {
    let mut meta = String::new();
    if let Some(product) = &entry.product {
        meta.push_str(&format!(" · product {}", escape_html(product)));
    }
    if let Some(api_version) = &entry.api_version {
        meta.push_str(&format!(" · API {}", escape_html(api_version)));
    }

    let body = format!(
        r#"<h1>{title}</h1>
<div class="meta">#{id} · <a href="{cat_link}">{category}</a> · created {created} · updated {updated} · used {uses}x{meta}</div>
<div>{tags}</div>
<h2>Problem</h2>
<pre>{problem}</pre>
<h2>Solution</h2>
<pre>{solution}</pre>
{code}{notes}<form action="/entries/{id}/use" method="post">
<input type="hidden" name="helpful" value="true"><button type="submit">Helpful</button>
</form>
<form action="/entries/{id}/use" method="post">
<input type="hidden" name="helpful" value="false"><button type="submit">Not helpful</button>
</form>
<form action="/entries/{id}/use" method="post">
<label>Usage note <input type="text" name="notes"></label><button type="submit">Record use</button>
</form>
{usage_notes}<p><a href="/entries/{id}/edit">Edit</a></p>
"#,
        id = entry.id,
        title = escape_html(&entry.title),
        cat_link = search_link("category", &entry.category),
        category = escape_html(&entry.category),
        created = entry.created_at.format("%Y-%m-%d %H:%M"),
        updated = entry.updated_at.format("%Y-%m-%d %H:%M"),
        uses = entry.usage_count,
        tags = render_tags(&entry.tags),
        problem = escape_html(&entry.problem),
        solution = escape_html(&entry.solution),
        meta = meta,
        code = render_optional_section("Code examples", entry.code_examples.as_deref()),
        notes = render_optional_section("Notes", entry.notes.as_deref()),
        usage_notes = render_usage_notes(history),
    );
    layout(&entry.title, &body)
}

fn datalist(id: &str, values: &[String]) -> String {
    let options: String = values
        .iter()
        .map(|v| format!(r#"<option value="{}">"#, escape_html(v)))
        .collect();
    format!(r#"<datalist id="{}">{}</datalist>"#, id, options)
}

/// Add or edit form. `action` is the POST target.
pub fn entry_form(
    heading: &str,
    action: &str,
    form: &EntryForm,
    error: Option<&str>,
    suggestions: &SuggestionsConfig,
) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape_html(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<h1>{heading}</h1>
{error}
<form action="{action}" method="post">
<label>Title <input type="text" name="title" value="{title}" required></label>
<label>Problem <textarea name="problem" rows="6" required>{problem}</textarea></label>
<label>Solution <textarea name="solution" rows="8" required>{solution}</textarea></label>
<label>Category <input type="text" name="category" list="categories" value="{category}"></label>
{categories}
<label>Tags (comma separated) <input type="text" name="tags" value="{tags}"></label>
<label>Product <input type="text" name="product" list="products" value="{product}"></label>
{products}
<label>API version <input type="text" name="api_version" value="{api_version}"></label>
<label>Code examples <textarea name="code_examples" rows="6">{code_examples}</textarea></label>
<label>Notes <textarea name="notes" rows="4">{notes}</textarea></label>
<p><button type="submit">Save</button></p>
</form>
"#,
        heading = escape_html(heading),
        error = error,
        action = escape_html(action),
        title = escape_html(&form.title),
        problem = escape_html(&form.problem),
        solution = escape_html(&form.solution),
        category = escape_html(&form.category),
        categories = datalist("categories", &suggestions.categories),
        tags = escape_html(&form.tags),
        product = escape_html(&form.product),
        products = datalist("products", &suggestions.products),
        api_version = escape_html(&form.api_version),
        code_examples = escape_html(&form.code_examples),
        notes = escape_html(&form.notes),
    );
    layout(heading, &body)
}

pub fn search_results(filter: &SearchFilter, hits: &[KnowledgeEntry]) -> String {
    let value = |v: &Option<String>| escape_html(v.as_deref().unwrap_or(""));
    let body = format!(
        r#"<h1>Search</h1>
<form action="/search" method="get">
<input type="text" name="q" value="{q}" placeholder="text">
<input type="text" name="category" value="{category}" placeholder="category">
<input type="text" name="tag" value="{tag}" placeholder="tag">
<input type="text" name="product" value="{product}" placeholder="product">
<button type="submit">Search</button>
</form>
<p>{count} results</p>
{results}
"#,
        q = value(&filter.query),
        category = value(&filter.category),
        tag = value(&filter.tag),
        product = value(&filter.product),
        count = hits.len(),
        results = render_list(hits, "No matching entries."),
    );
    layout("Search", &body)
}

pub fn stats_page(stats: &Stats) -> String {
    let most_used = if stats.most_used.is_empty() {
        "<p>No usage recorded yet.</p>".to_string()
    } else {
        let items: String = stats
            .most_used
            .iter()
            .map(|u| {
                format!(
                    r#"<li><a href="/entries/{}">{}</a> ({} uses)</li>"#,
                    u.id,
                    escape_html(&u.title),
                    u.usage_count
                )
            })
            .collect();
        format!("<ol>{}</ol>", items)
    };

    let body = format!(
        r#"<h1>Stats</h1>
<p>Total entries: {total}</p>
<p>Added in the last {days} days: {recent}</p>
<h2>Categories</h2>
{categories}
<h2>Tags</h2>
{tags}
<h2>Most used</h2>
{most_used}
"#,
        total = stats.total_count,
        days = RECENT_WINDOW_DAYS,
        recent = stats.recent_additions,
        categories = render_label_links("category", &stats.category_list),
        tags = render_label_links("tag", &stats.tag_list),
        most_used = most_used,
    );
    layout("Stats", &body)
}

pub fn error_page(heading: &str, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/\">Back to dashboard</a></p>",
        escape_html(heading),
        escape_html(message)
    );
    layout(heading, &body)
}
