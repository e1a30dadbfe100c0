//! TOML configuration parsing and validation.
//!
//! Every section is optional. A typical file:
//!
//! ```toml
//! [db]
//! path = "./data/kb.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [suggestions]
//! categories = ["general", "webhooks", "orders-api"]
//! products = ["admin", "checkout"]
//! ```
//!
//! Suggestions only populate UI pick lists. They are never enforced on
//! stored values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub suggestions: SuggestionsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/kb.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

/// Suggestion lists shown in the add/edit forms.
#[derive(Debug, Deserialize, Clone)]
pub struct SuggestionsConfig {
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    /// Suggestions for the product field.
    #[serde(default)]
    pub products: Vec<String>,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            products: Vec::new(),
        }
    }
}

fn default_categories() -> Vec<String> {
    vec![support_kb_core::models::DEFAULT_CATEGORY.to_string()]
}

impl Config {
    /// Defaults used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Load and validate a config file.
///
/// A missing file yields [`Config::minimal`]; an unreadable or unparsable
/// one is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "config file not found, using defaults"
        );
        return Ok(Config::minimal());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    config
        .suggestions
        .categories
        .retain(|c| !c.trim().is_empty());
    if config.suggestions.categories.is_empty() {
        config.suggestions.categories = default_categories();
    }

    Ok(config)
}
