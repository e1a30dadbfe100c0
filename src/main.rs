//! # Support KB CLI (`kb`)
//!
//! Record support problems with their solutions, find them again, and serve
//! the same knowledge base over a small web interface.
//!
//! ## Usage
//!
//! ```bash
//! kb --config ./config/kb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kb init` | Create the SQLite database and schema |
//! | `kb add <title> <problem> <solution>` | Record a new entry |
//! | `kb show <id>` | Print one entry in full |
//! | `kb edit <id>` | Change selected fields of an entry |
//! | `kb list` | List entries, most recently updated first |
//! | `kb search [query]` | Filter by text, category and tag |
//! | `kb stats` | Counts by category, tag and usage |
//! | `kb use <id>` | Record that an entry helped (or didn't) |
//! | `kb export <path>` | Write all entries to a JSON file |
//! | `kb import <path>` | Load entries from a JSON file |
//! | `kb serve` | Start the web interface |
//!
//! ## Exit codes
//!
//! `0` success, `2` validation error, `3` entry not found, `4` malformed
//! import file, `1` anything else.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use support_kb::config::{self, Config};
use support_kb::{entries, export, import, logging, search, server, stats};
use support_kb::sqlite_store::SqliteStore;
use support_kb_core::transfer::ImportMode;
use support_kb_core::KbError;

/// Support KB: a local-first knowledge base for support problems and
/// their solutions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/kb.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "kb",
    about = "Support KB: a local-first knowledge base for support problems and their solutions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/kb.toml`. A missing file means built-in defaults.
    #[arg(long, global = true, default_value = "./config/kb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Running it again is safe.
    Init,

    /// Add a new entry and print its id.
    Add {
        title: String,
        problem: String,
        solution: String,

        /// Category (defaults to `general`).
        #[arg(long)]
        category: Option<String>,

        /// Comma-separated tags, e.g. `hmac,signing`.
        #[arg(long)]
        tags: Option<String>,

        /// Product or surface the problem occurs in.
        #[arg(long)]
        product: Option<String>,

        /// API version the entry applies to, e.g. `2024-01`.
        #[arg(long)]
        api_version: Option<String>,

        /// Code or payload snippet.
        #[arg(long = "code")]
        code_examples: Option<String>,

        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show one entry with its problem, solution and usage.
    Show { id: i64 },

    /// Update selected fields of an entry.
    Edit {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        problem: Option<String>,

        #[arg(long)]
        solution: Option<String>,

        /// New category. An empty value resets it to `general`.
        #[arg(long)]
        category: Option<String>,

        /// Replacement comma-separated tag list. An empty value clears the tags.
        #[arg(long)]
        tags: Option<String>,

        /// An empty value clears the product.
        #[arg(long)]
        product: Option<String>,

        #[arg(long)]
        api_version: Option<String>,

        #[arg(long = "code")]
        code_examples: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List entries, most recently updated first.
    List {
        #[arg(long)]
        limit: Option<usize>,

        /// Print problem and solution text too.
        #[arg(long)]
        detailed: bool,
    },

    /// Search entries.
    ///
    /// The query matches case-insensitively anywhere in the title, problem,
    /// solution, code examples, category or tags. `--category`, `--tag` and
    /// `--product` must match exactly (ignoring case). All given filters must
    /// hold.
    Search {
        query: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        #[arg(long)]
        product: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        detailed: bool,
    },

    /// Show knowledge base statistics.
    Stats,

    /// Record that an entry was used.
    Use {
        id: i64,

        /// The entry solved the problem.
        #[arg(long, conflicts_with = "not_helpful")]
        helpful: bool,

        /// The entry did not solve the problem.
        #[arg(long)]
        not_helpful: bool,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Export all entries to a JSON file.
    Export { path: PathBuf },

    /// Import entries from a JSON file.
    Import {
        path: PathBuf,

        /// Add to the existing entries (default).
        #[arg(long, conflicts_with = "replace")]
        merge: bool,

        /// Delete all existing entries first.
        #[arg(long)]
        replace: bool,
    },

    /// Start the web interface on `[server].bind`.
    Serve,

    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Commands::Serve => logging::SERVE_FILTER,
        _ => logging::CLI_FILTER,
    };
    logging::init(default_filter);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "kb", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&cfg).await?,
        Commands::Add {
            title,
            problem,
            solution,
            category,
            tags,
            product,
            api_version,
            code_examples,
            notes,
        } => {
            let extras = entries::Extras {
                category,
                tags,
                product,
                api_version,
                code_examples,
                notes,
            };
            entries::run_add(&cfg, title, problem, solution, extras).await?
        }
        Commands::Show { id } => entries::run_show(&cfg, id).await?,
        Commands::Edit {
            id,
            title,
            problem,
            solution,
            category,
            tags,
            product,
            api_version,
            code_examples,
            notes,
        } => {
            let args = entries::EditArgs {
                title,
                problem,
                solution,
                category,
                tags,
                product,
                api_version,
                code_examples,
                notes,
            };
            entries::run_edit(&cfg, id, args).await?
        }
        Commands::List { limit, detailed } => entries::run_list(&cfg, limit, detailed).await?,
        Commands::Search {
            query,
            category,
            tag,
            product,
            limit,
            detailed,
        } => {
            let filter = search::build_filter(query, category, tag, product);
            search::run_search(&cfg, filter, limit, detailed).await?
        }
        Commands::Stats => stats::run_stats(&cfg).await?,
        Commands::Use {
            id,
            helpful,
            not_helpful,
            notes,
        } => {
            let helpful = match (helpful, not_helpful) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            entries::run_use(&cfg, id, helpful, notes).await?
        }
        Commands::Export { path } => export::run_export(&cfg, &path).await?,
        Commands::Import {
            path,
            merge: _,
            replace,
        } => {
            let mode = if replace {
                ImportMode::Replace
            } else {
                ImportMode::Merge
            };
            import::run_import(&cfg, &path, mode).await?
        }
        Commands::Serve => server::run_server(&cfg).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn run_init(cfg: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(cfg).await?;
    store.close().await;
    println!("Database initialized at {}", cfg.db.path.display());
    Ok(())
}

/// Map an error to the process exit code by its [`KbError`] kind.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<KbError>() {
        Some(KbError::Validation(_)) => 2,
        Some(KbError::NotFound(_)) => 3,
        Some(KbError::Format(_)) => 4,
        _ => 1,
    }
}
