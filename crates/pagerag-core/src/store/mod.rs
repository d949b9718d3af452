//! Vector store abstraction.
//!
//! The [`VectorIndex`] trait is everything the indexer and query engine need
//! from a persistent nearest-neighbour store: an id-only existence check, an
//! idempotent batched insert, and ranked similarity search. Each index owns
//! its embedding function, so callers hand it text and never vectors.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`existing_ids`](VectorIndex::existing_ids) | Ids currently stored (no content or vectors) |
//! | [`content_hashes`](VectorIndex::content_hashes) | Stored SHA-256 of each requested id |
//! | [`add`](VectorIndex::add) | Embed and insert chunks, ignoring ids already present |
//! | [`similarity_search`](VectorIndex::similarity_search) | Top-k chunks by similarity |
//! | [`count`](VectorIndex::count) | Number of stored chunks |

pub mod memory;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Chunk, ChunkId, ScoredChunk};

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// All chunk ids currently persisted.
    async fn existing_ids(&self) -> Result<HashSet<ChunkId>>;

    /// Stored content hashes for the given ids. Unknown ids are absent from
    /// the result.
    async fn content_hashes(&self, ids: &[ChunkId]) -> Result<HashMap<ChunkId, String>>;

    /// Embed and persist chunks keyed by their assigned id.
    ///
    /// Idempotent per id: a chunk whose id is already stored is left
    /// untouched. Returns the number of rows actually written. Chunks
    /// without an id fail with
    /// [`RagError::MissingIdentityKey`](crate::RagError::MissingIdentityKey).
    async fn add(&self, chunks: &[Chunk]) -> Result<usize>;

    /// Up to `k` chunks ordered by non-increasing similarity to `query`.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of stored chunks.
    async fn count(&self) -> Result<usize>;
}

/// Sort hits best-first and keep the top `k`. Ties keep their input order;
/// NaN scores rank last.
pub fn rank_top_k(mut hits: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    fn key(score: f32) -> f32 {
        if score.is_nan() {
            f32::NEG_INFINITY
        } else {
            score
        }
    }
    hits.sort_by(|a, b| key(b.score).total_cmp(&key(a.score)));
    hits.truncate(k);
    hits
}
