//! Portable JSON export format.
//!
//! An export file is an object with an `entries` array; a bare array of
//! entry objects is also accepted on import:
//!
//! ```json
//! {
//!   "exported_at": "2026-01-05T10:00:00Z",
//!   "entries": [
//!     { "id": 1, "title": "Webhook 403 errors", "problem": "...", "solution": "...",
//!       "category": "webhooks", "tags": ["hmac"], "product": "checkout",
//!       "code_examples": "...", "created_at": "...", "updated_at": "...",
//!       "usage_count": 0 }
//!   ]
//! }
//! ```
//!
//! `product`, `api_version`, `code_examples` and `notes` are written only
//! when set. `shopify_product` is read as an alias of `product`.
//!
//! Embedded ids are carried for reference only. Importing never reuses them:
//! the store assigns fresh ids in both merge and replace mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KbError, Result};
use crate::models::{
    normalize_category, normalize_optional, normalize_tags, normalize_text, parse_tags,
    KnowledgeEntry, NewEntry,
};

/// How an import treats existing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Append to the existing entries.
    #[default]
    Merge,
    /// Remove all existing entries first.
    Replace,
}

/// A validated entry ready to be inserted by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedEntry {
    pub entry: NewEntry,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub usage_count: i64,
}

#[derive(Debug, Serialize)]
struct ExportFile<'a> {
    exported_at: DateTime<Utc>,
    entries: Vec<ExportedEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ExportedEntry<'a> {
    id: i64,
    title: &'a str,
    problem: &'a str,
    solution: &'a str,
    category: &'a str,
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    product: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_examples: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    usage_count: i64,
}

/// Tags may be written as an array or as the stored comma-joined string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagField {
    List(Vec<String>),
    Joined(String),
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    title: Option<String>,
    problem: Option<String>,
    solution: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<TagField>,
    #[serde(default, alias = "shopify_product")]
    product: Option<String>,
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    code_examples: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    usage_count: Option<i64>,
}

/// Serialize `entries` into export file text, oldest first.
pub fn encode(entries: &[KnowledgeEntry], exported_at: DateTime<Utc>) -> Result<String> {
    let mut ordered: Vec<&KnowledgeEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let file = ExportFile {
        exported_at,
        entries: ordered
            .into_iter()
            .map(|e| ExportedEntry {
                id: e.id,
                title: &e.title,
                problem: &e.problem,
                solution: &e.solution,
                category: &e.category,
                tags: &e.tags,
                product: e.product.as_deref(),
                api_version: e.api_version.as_deref(),
                code_examples: e.code_examples.as_deref(),
                notes: e.notes.as_deref(),
                created_at: e.created_at,
                updated_at: e.updated_at,
                usage_count: e.usage_count,
            })
            .collect(),
    };

    serde_json::to_string_pretty(&file).map_err(|e| KbError::Format(e.to_string()))
}

/// Parse and validate export file text.
///
/// The whole file is validated before anything is returned, so a store never
/// sees a partially valid import. Missing timestamps default to `now`.
pub fn decode(text: &str, now: DateTime<Utc>) -> Result<Vec<ImportedEntry>> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| KbError::Format(format!("not valid JSON: {}", e)))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("entries") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(KbError::Format(
                    "expected an `entries` array in the export object".to_string(),
                ))
            }
        },
        _ => {
            return Err(KbError::Format(
                "expected an array of entries or an object with an `entries` array".to_string(),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let raw: RawEntry = serde_json::from_value(item)
                .map_err(|e| KbError::Format(format!("entry {}: {}", index, e)))?;
            validate(index, raw, now)
        })
        .collect()
}

fn validate(index: usize, raw: RawEntry, now: DateTime<Utc>) -> Result<ImportedEntry> {
    let field = |name: &str, value: Option<String>| -> Result<String> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(KbError::Format(format!(
                "entry {}: missing required field `{}`",
                index, name
            ))),
        }
    };

    let title = field("title", raw.title)?;
    let problem = field("problem", raw.problem)?;
    let solution = field("solution", raw.solution)?;

    let tags = match raw.tags {
        Some(TagField::List(list)) => normalize_tags(&list),
        Some(TagField::Joined(joined)) => parse_tags(&joined),
        None => Vec::new(),
    };

    let created_at = raw.created_at.or(raw.updated_at).unwrap_or(now);
    let updated_at = raw.updated_at.unwrap_or(created_at);
    if updated_at < created_at {
        return Err(KbError::Format(format!(
            "entry {}: updated_at is earlier than created_at",
            index
        )));
    }

    let usage_count = raw.usage_count.unwrap_or(0);
    if usage_count < 0 {
        return Err(KbError::Format(format!(
            "entry {}: usage_count must not be negative",
            index
        )));
    }

    Ok(ImportedEntry {
        entry: NewEntry {
            title,
            problem,
            solution,
            category: Some(normalize_category(raw.category.as_deref())),
            tags,
            product: normalize_optional(raw.product.as_deref()),
            api_version: normalize_optional(raw.api_version.as_deref()),
            code_examples: normalize_text(raw.code_examples.as_deref()),
            notes: normalize_text(raw.notes.as_deref()),
        },
        created_at,
        updated_at,
        usage_count,
    })
}
