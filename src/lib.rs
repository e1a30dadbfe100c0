//! # Support KB
//!
//! A local-first knowledge base for support problems and the solutions that
//! fixed them.
//!
//! Entries (title, problem, solution, category, tags and optional product,
//! API version, code examples and notes) live in a single SQLite
//! file. They are reachable from the `kb` CLI and a small web interface, and
//! can be moved between machines as a JSON export.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐
//! │   CLI    │   │   Web    │
//! │  (kb)    │   │  (axum)  │
//! └────┬─────┘   └────┬─────┘
//!      └──────┬───────┘
//!             ▼
//!      ┌─────────────┐   ┌──────────┐
//!      │ Store trait │──▶│  SQLite  │
//!      │  (core)     │   │  (sqlx)  │
//!      └─────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kb init
//! kb add "Webhook 403 errors" "Signature mismatch" "Verify against the raw body" \
//!     --category webhooks --tags hmac,signing
//! kb search webhook
//! kb stats
//! kb serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite implementation of the `Store` trait |
//! | [`entries`] | add, show, edit, list and use commands |
//! | [`search`] | search command |
//! | [`stats`] | stats command |
//! | [`export`] | JSON export |
//! | [`import`] | JSON import (merge or replace) |
//! | [`server`] | Web interface and JSON API |
//! | [`pages`] | HTML rendering |
//! | [`logging`] | tracing subscriber setup |
//!
//! The entry model, search filter, stats and export format live in the
//! `support-kb-core` crate.

pub mod config;
pub mod db;
pub mod entries;
pub mod export;
pub mod import;
pub mod logging;
pub mod migrate;
pub mod pages;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod stats;
