//! Core data models for the knowledge base.
//!
//! A [`KnowledgeEntry`] is the only content entity. Callers supply content
//! through [`NewEntry`] and [`EntryPatch`]; the store owns ids, timestamps
//! and the usage counter.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KbError, Result};

/// Category assigned when none (or a blank one) is supplied.
pub const DEFAULT_CATEGORY: &str = "general";

/// One recorded problem/solution record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: i64,
    pub title: String,
    pub problem: String,
    pub solution: String,
    pub category: String,
    pub tags: Vec<String>,
    /// Product or surface the problem occurs in, e.g. `"checkout"`.
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    /// Code or payload snippets that go with the solution.
    #[serde(default)]
    pub code_examples: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub usage_count: i64,
}

impl KnowledgeEntry {
    /// Tags in their stored comma-joined form.
    pub fn tags_joined(&self) -> String {
        join_tags(&self.tags)
    }

    /// Case-insensitive membership test against the tag list.
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == wanted)
    }
}

/// Content for a new entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEntry {
    pub title: String,
    pub problem: String,
    pub solution: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub product: Option<String>,
    pub api_version: Option<String>,
    pub code_examples: Option<String>,
    pub notes: Option<String>,
}

impl NewEntry {
    pub fn new(
        title: impl Into<String>,
        problem: impl Into<String>,
        solution: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            problem: problem.into(),
            solution: solution.into(),
            category: None,
            tags: Vec::new(),
            product: None,
            api_version: None,
            code_examples: None,
            notes: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn with_code_examples(mut self, code: impl Into<String>) -> Self {
        self.code_examples = Some(code.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("problem", &self.problem)?;
        require("solution", &self.solution)?;
        Ok(())
    }

    /// The category that will be stored for this entry.
    pub fn resolved_category(&self) -> String {
        normalize_category(self.category.as_deref())
    }

    /// The tag list that will be stored for this entry.
    pub fn resolved_tags(&self) -> Vec<String> {
        normalize_tags(&self.tags)
    }

    /// The normalized entry a store persists. Stores that assign the id on
    /// insert pass a placeholder.
    pub fn to_entry(
        &self,
        id: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        usage_count: i64,
    ) -> KnowledgeEntry {
        KnowledgeEntry {
            id,
            title: self.title.clone(),
            problem: self.problem.clone(),
            solution: self.solution.clone(),
            category: self.resolved_category(),
            tags: self.resolved_tags(),
            product: normalize_optional(self.product.as_deref()),
            api_version: normalize_optional(self.api_version.as_deref()),
            code_examples: normalize_text(self.code_examples.as_deref()),
            notes: normalize_text(self.notes.as_deref()),
            created_at,
            updated_at,
            usage_count,
        }
    }
}

/// A partial update. Only `Some` fields are applied.
///
/// For the optional text fields a blank value clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub product: Option<String>,
    pub api_version: Option<String>,
    pub code_examples: Option<String>,
    pub notes: Option<String>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.problem.is_none()
            && self.solution.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.product.is_none()
            && self.api_version.is_none()
            && self.code_examples.is_none()
            && self.notes.is_none()
    }

    /// Validate the supplied fields and apply them to `entry`.
    ///
    /// Timestamps are left alone; the store refreshes `updated_at`.
    pub fn apply(&self, entry: &mut KnowledgeEntry) -> Result<()> {
        if let Some(title) = &self.title {
            require("title", title)?;
        }
        if let Some(problem) = &self.problem {
            require("problem", problem)?;
        }
        if let Some(solution) = &self.solution {
            require("solution", solution)?;
        }

        if let Some(title) = &self.title {
            entry.title = title.clone();
        }
        if let Some(problem) = &self.problem {
            entry.problem = problem.clone();
        }
        if let Some(solution) = &self.solution {
            entry.solution = solution.clone();
        }
        if let Some(category) = &self.category {
            entry.category = normalize_category(Some(category));
        }
        if let Some(tags) = &self.tags {
            entry.tags = normalize_tags(tags);
        }
        if let Some(product) = &self.product {
            entry.product = normalize_optional(Some(product.as_str()));
        }
        if let Some(api_version) = &self.api_version {
            entry.api_version = normalize_optional(Some(api_version.as_str()));
        }
        if let Some(code) = &self.code_examples {
            entry.code_examples = normalize_text(Some(code.as_str()));
        }
        if let Some(notes) = &self.notes {
            entry.notes = normalize_text(Some(notes.as_str()));
        }
        Ok(())
    }
}

/// Input for recording that an entry was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageInput {
    /// Where the use happened, e.g. `"cli"` or `"web"`.
    pub context: String,
    pub helpful: Option<bool>,
    pub notes: Option<String>,
}

impl UsageInput {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            helpful: None,
            notes: None,
        }
    }
}

/// A stored usage event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    pub id: i64,
    pub entry_id: i64,
    pub used_at: DateTime<Utc>,
    pub context: String,
    pub helpful: Option<bool>,
    pub notes: Option<String>,
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KbError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Resolve an optional category to its stored form.
pub fn normalize_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

/// Trim a short optional label. Blank means absent.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Optional free text keeps its formatting but blank means absent.
pub fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

/// Split a comma-joined tag string. Empty tokens are dropped, order is kept.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

/// Re-split each tag so that no stored token contains a comma.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter().flat_map(|t| parse_tags(t)).collect()
}

/// Current time truncated to the millisecond precision the stores keep.
pub fn now() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

/// The `updated_at` to stamp on a mutation: strictly after `previous`.
pub fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + TimeDelta::milliseconds(1);
    if now > floor {
        now
    } else {
        floor
    }
}
