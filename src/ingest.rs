//! `pagerag ingest`: load, split, identify, and incrementally index.
//!
//! With `--reset` the store directory is deleted first, so the run rebuilds
//! everything. Without it only chunks whose id is not yet stored are
//! embedded and written.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use pagerag_core::chunk::RecursiveCharacterSplitter;
use pagerag_core::embedding::Embedder;
use pagerag_core::indexer::{IncrementalIndexer, IndexReport};
use pagerag_core::source::DocumentSource;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::loader::DirectoryLoader;
use crate::sqlite_store::SqliteIndex;

/// Run ingestion with the configured loader and embedding provider.
pub async fn run_ingest(config: &Config, reset: bool) -> Result<IndexReport> {
    let embedder = create_embedder(&config.embedding)?;
    let loader = DirectoryLoader::new(&config.documents)?;
    ingest_with(config, &loader, embedder, reset).await
}

/// Ingestion over an explicit document source and embedder.
pub async fn ingest_with(
    config: &Config,
    source: &dyn DocumentSource,
    embedder: Arc<dyn Embedder>,
    reset: bool,
) -> Result<IndexReport> {
    if reset {
        println!("✨ Clearing Database");
        let removed = db::reset_store(&config.store.path)?;
        info!(path = %config.store.path.display(), removed, "store reset");
    }

    let documents = source.load().context("Failed to load documents")?;
    info!(documents = documents.len(), "documents loaded");

    let splitter = RecursiveCharacterSplitter::new(
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    );
    debug!(
        chunk_size = splitter.chunk_size(),
        chunk_overlap = splitter.chunk_overlap(),
        "splitting documents"
    );

    let pool = db::connect(&config.store).await?;
    let index = SqliteIndex::new(pool.clone(), config.store.collection.clone(), embedder)
        .with_batch_size(config.embedding.batch_size);
    let indexer = IncrementalIndexer::new(Arc::new(index)).with_stale_detection(true);

    let result = indexer.index_documents(&documents, &splitter).await;
    pool.close().await;
    let report = result?;

    print_report(&report);
    Ok(report)
}

fn print_report(report: &IndexReport) {
    println!("Number of existing documents in DB: {}", report.existing);
    if report.added > 0 {
        println!("New {} documents added to the DB", report.added);
    } else {
        println!("No documents to add!");
    }
    if report.duplicates_in_batch > 0 {
        println!(
            "  {} chunks shared an id with an earlier chunk and were not stored",
            report.duplicates_in_batch
        );
    }
    if !report.stale.is_empty() {
        println!(
            "  {} stored chunks differ from their source; run with --reset to refresh",
            report.stale.len()
        );
    }
}
