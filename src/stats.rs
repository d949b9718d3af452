//! `pagerag stats`: what is in the store.
//!
//! Prints the store location, database size, chunk count, and a per-source
//! breakdown with the time each source was last indexed.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

struct SourceStats {
    source: String,
    chunk_count: i64,
    pages: i64,
    last_indexed: i64,
}

#[derive(Default)]
struct StoreStats {
    total_chunks: i64,
    sources: Vec<SourceStats>,
}

/// Read-only: a store that was never ingested reports zero chunks.
async fn collect_stats(config: &Config) -> Result<StoreStats> {
    let Some(pool) = db::open_existing(&config.store).await? else {
        return Ok(StoreStats::default());
    };

    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
        .bind(&config.store.collection)
        .fetch_one(&pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT
            COALESCE(json_extract(metadata_json, '$.source'), '?') AS source,
            COUNT(*) AS chunk_count,
            COUNT(DISTINCT json_extract(metadata_json, '$.page_label')) AS pages,
            MAX(indexed_at) AS last_indexed
        FROM chunks
        WHERE collection = ?
        GROUP BY source
        ORDER BY source
        "#,
    )
    .bind(&config.store.collection)
    .fetch_all(&pool)
    .await?;

    let sources = rows
        .iter()
        .map(|row| SourceStats {
            source: row.get("source"),
            chunk_count: row.get("chunk_count"),
            pages: row.get("pages"),
            last_indexed: row.get("last_indexed"),
        })
        .collect();

    pool.close().await;
    Ok(StoreStats {
        total_chunks,
        sources,
    })
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let StoreStats {
        total_chunks,
        sources,
    } = collect_stats(config).await?;

    let db_size = std::fs::metadata(db::db_path(&config.store))
        .map(|m| m.len())
        .unwrap_or(0);

    println!("pagerag store");
    println!("=============");
    println!();
    println!("  Store:       {}", config.store.path.display());
    println!("  Collection:  {}", config.store.collection);
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Chunks:      {}", total_chunks);

    if !sources.is_empty() {
        println!();
        println!(
            "  {:<40} {:>6} {:>8}   {}",
            "SOURCE", "PAGES", "CHUNKS", "LAST INDEXED"
        );
        println!("  {}", "-".repeat(76));
        for s in &sources {
            println!(
                "  {:<40} {:>6} {:>8}   {}",
                s.source,
                s.pages,
                s.chunk_count,
                format_ts(s.last_indexed)
            );
        }
    }
    println!();

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
