use sqlx::{Row, SqlitePool};

/// Nullable columns added after the first schema version.
const OPTIONAL_COLUMNS: &[&str] = &["product", "api_version", "code_examples", "notes"];

/// Create the schema if it does not exist. Safe to run on every start.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // AUTOINCREMENT keeps ids from being reused after a replace import.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            problem TEXT NOT NULL,
            solution TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT 'general',
            tags TEXT NOT NULL DEFAULT '',
            product TEXT,
            api_version TEXT,
            code_examples TEXT,
            notes TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            usage_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    add_missing_columns(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entry_usage (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id INTEGER NOT NULL,
            used_at INTEGER NOT NULL,
            context TEXT NOT NULL,
            helpful INTEGER,
            notes TEXT,
            FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_updated_at ON entries(updated_at DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entry_usage_entry_id ON entry_usage(entry_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Bring an `entries` table created by an older build up to date.
async fn add_missing_columns(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing: Vec<String> = sqlx::query("PRAGMA table_info(entries)")
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect::<Result<_, _>>()?;

    for column in OPTIONAL_COLUMNS {
        if !existing.iter().any(|name| name == column) {
            sqlx::query(&format!("ALTER TABLE entries ADD COLUMN {} TEXT", column))
                .execute(pool)
                .await?;
            tracing::info!(column, "added column to entries");
        }
    }
    Ok(())
}
