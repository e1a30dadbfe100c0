//! # Support KB Core
//!
//! Shared logic for the support knowledge base: the entry model, the error
//! taxonomy, the [`store::Store`] abstraction with an in-memory backend, the
//! search filter, statistics, and the JSON export format.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. The application
//! crate supplies the SQLite store and the CLI / web front ends.

pub mod error;
pub mod models;
pub mod search;
pub mod stats;
pub mod store;
pub mod transfer;

pub use error::{KbError, Result};
pub use models::{EntryPatch, KnowledgeEntry, NewEntry, UsageInput, UsageRecord};
pub use search::SearchFilter;
pub use stats::Stats;
pub use store::Store;
pub use transfer::{ImportMode, ImportedEntry};
