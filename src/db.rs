//! Store directory, SQLite connection, and schema.
//!
//! The whole persisted state is one directory (`[store].path`) holding
//! `chunks.sqlite` and its WAL files. Resetting the store is a recursive
//! delete of that directory.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::StoreConfig;

pub const DB_FILE_NAME: &str = "chunks.sqlite";

pub fn db_path(store: &StoreConfig) -> PathBuf {
    store.path.join(DB_FILE_NAME)
}

/// Open (creating if needed) the store database and apply the schema.
pub async fn connect(store: &StoreConfig) -> Result<SqlitePool> {
    std::fs::create_dir_all(&store.path)
        .with_context(|| format!("Failed to create store directory: {}", store.path.display()))?;

    let path = db_path(store);
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open store: {}", path.display()))?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Open the store database for reading only. Returns `None` when nothing
/// has been ingested yet; never creates files, directories, or tables.
pub async fn open_existing(store: &StoreConfig) -> Result<Option<SqlitePool>> {
    let path = db_path(store);
    if !path.exists() {
        return Ok(None);
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(false)
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open store: {}", path.display()))?;

    Ok(Some(pool))
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT NOT NULL,
            collection TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            content_hash TEXT NOT NULL,
            embedding BLOB NOT NULL,
            indexed_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete the store directory and everything in it. Returns whether there
/// was anything to delete.
pub fn reset_store(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(path)
        .with_context(|| format!("Failed to remove store directory: {}", path.display()))?;
    Ok(true)
}
