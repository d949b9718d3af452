//! In-memory [`VectorIndex`] for tests and ephemeral use.
//!
//! Entries live in a `Vec` behind a `std::sync::RwLock`, in insertion
//! order. Search is brute-force cosine similarity over all stored vectors.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{RagError, Result};
use crate::models::{Chunk, ChunkId, ScoredChunk};

use super::{rank_top_k, VectorIndex};

struct StoredChunk {
    id: ChunkId,
    chunk: Chunk,
    hash: String,
    vector: Vec<f32>,
}

pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredChunk>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }
}

fn poisoned<T>(_: T) -> RagError {
    RagError::StoreUnavailable("in-memory index lock poisoned".to_string())
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn existing_ids(&self) -> Result<HashSet<ChunkId>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.iter().map(|e| e.id.clone()).collect())
    }

    async fn content_hashes(&self, ids: &[ChunkId]) -> Result<HashMap<ChunkId, String>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .iter()
            .filter(|e| wanted.contains(e.id.as_str()))
            .map(|e| (e.id.clone(), e.hash.clone()))
            .collect())
    }

    async fn add(&self, chunks: &[Chunk]) -> Result<usize> {
        let mut ids = Vec::with_capacity(chunks.len());
        for (position, chunk) in chunks.iter().enumerate() {
            let id = chunk.id().ok_or(RagError::MissingIdentityKey {
                position,
                key: crate::models::ID_KEY,
            })?;
            ids.push(id.to_string());
        }
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::EmbeddingFailure(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let mut entries = self.entries.write().map_err(poisoned)?;
        let mut present: HashSet<ChunkId> = entries.iter().map(|e| e.id.clone()).collect();
        let mut written = 0;
        for ((id, chunk), vector) in ids.into_iter().zip(chunks).zip(vectors) {
            if !present.insert(id.clone()) {
                continue;
            }
            entries.push(StoredChunk {
                id,
                hash: chunk.content_hash(),
                chunk: chunk.clone(),
                vector,
            });
            written += 1;
        }
        Ok(written)
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed_query(query).await?;
        let entries = self.entries.read().map_err(poisoned)?;
        let hits = entries
            .iter()
            .map(|e| ScoredChunk {
                chunk: e.chunk.clone(),
                score: cosine_similarity(&query_vec, &e.vector),
            })
            .collect();
        Ok(rank_top_k(hits, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(poisoned)?.len())
    }
}
