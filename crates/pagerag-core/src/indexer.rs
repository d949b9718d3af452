//! Incremental indexing.
//!
//! [`IncrementalIndexer`] writes only the chunks whose id is not yet in the
//! store. It fetches the existing id set once, partitions the incoming
//! chunks into new and already-present, and hands the new ones to
//! [`VectorIndex::add`] in a single batch. A second run over an unchanged
//! corpus writes nothing.
//!
//! Two things are reported but never acted on:
//!
//! - **Duplicate ids within one run.** Adjacency numbering restarts at 0 when
//!   a page reappears after a different page, which can reproduce an id
//!   already seen in the batch. Only the first occurrence is written.
//! - **Stale content.** When enabled, the stored content hash of every
//!   skipped id is compared with the incoming chunk. A mismatch means the
//!   source changed under a stable id; only a full reset refreshes it.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chunk::Splitter;
use crate::error::{RagError, Result};
use crate::identity::assign_chunk_ids;
use crate::models::{Chunk, ChunkId, Document, ID_KEY};
use crate::store::VectorIndex;

/// Outcome of one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Ids in the store before the run.
    pub existing: usize,
    /// Chunks handed to the indexer.
    pub incoming: usize,
    /// Rows actually written by the store.
    pub added: usize,
    /// Incoming chunks whose id was already stored.
    pub skipped: usize,
    /// Incoming chunks that repeated an id earlier in the same batch.
    pub duplicates_in_batch: usize,
    /// Skipped ids whose stored content differs from the incoming chunk.
    pub stale: Vec<ChunkId>,
}

pub struct IncrementalIndexer {
    index: Arc<dyn VectorIndex>,
    detect_stale: bool,
}

impl IncrementalIndexer {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            detect_stale: false,
        }
    }

    /// Compare content hashes of skipped chunks against the store.
    pub fn with_stale_detection(mut self, enabled: bool) -> Self {
        self.detect_stale = enabled;
        self
    }

    /// Split documents, assign ids, and index the result.
    pub async fn index_documents(
        &self,
        documents: &[Document],
        splitter: &dyn Splitter,
    ) -> Result<IndexReport> {
        let chunks = splitter.split_documents(documents);
        debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            "split documents"
        );
        let chunks = assign_chunk_ids(chunks)?;
        self.index_chunks(&chunks).await
    }

    /// Index chunks that already carry an id.
    pub async fn index_chunks(&self, chunks: &[Chunk]) -> Result<IndexReport> {
        let existing = self.index.existing_ids().await?;

        let mut report = IndexReport {
            existing: existing.len(),
            incoming: chunks.len(),
            ..IndexReport::default()
        };

        let mut seen: HashSet<&str> = HashSet::new();
        let mut fresh: Vec<Chunk> = Vec::new();
        let mut skipped: Vec<&Chunk> = Vec::new();

        for (position, chunk) in chunks.iter().enumerate() {
            let id = chunk.id().ok_or(RagError::MissingIdentityKey {
                position,
                key: ID_KEY,
            })?;
            if existing.contains(id) {
                skipped.push(chunk);
            } else if !seen.insert(id) {
                report.duplicates_in_batch += 1;
                warn!(id, position, "duplicate chunk id in batch, keeping first");
            } else {
                fresh.push(chunk.clone());
            }
        }
        report.skipped = skipped.len();

        if self.detect_stale && !skipped.is_empty() {
            report.stale = self.find_stale(&skipped).await?;
            if !report.stale.is_empty() {
                warn!(
                    count = report.stale.len(),
                    ids = ?report.stale,
                    "stored chunks differ from source; reset to refresh"
                );
            }
        }

        if !fresh.is_empty() {
            report.added = self.index.add(&fresh).await?;
        }

        info!(
            existing = report.existing,
            incoming = report.incoming,
            added = report.added,
            skipped = report.skipped,
            "indexing complete"
        );
        Ok(report)
    }

    async fn find_stale(&self, skipped: &[&Chunk]) -> Result<Vec<ChunkId>> {
        let ids: Vec<ChunkId> = skipped
            .iter()
            .filter_map(|c| c.id().map(str::to_string))
            .collect();
        let stored = self.index.content_hashes(&ids).await?;
        Ok(skipped
            .iter()
            .filter_map(|chunk| {
                let id = chunk.id()?;
                match stored.get(id) {
                    Some(hash) if *hash != chunk.content_hash() => Some(id.to_string()),
                    _ => None,
                }
            })
            .collect())
    }
}
