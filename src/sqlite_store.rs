//! SQLite-backed [`VectorIndex`].
//!
//! One row per chunk in the `chunks` table, keyed by `(collection, id)`.
//! Vectors are stored as little-endian `f32` BLOBs and searched by
//! brute-force cosine similarity, which is plenty for a personal corpus of
//! a few thousand pages.
//!
//! Writes go through `INSERT OR IGNORE` inside a single transaction, so two
//! indexers racing on the same corpus can never produce duplicate ids: the
//! loser's rows are silently dropped and it reports fewer rows written.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use pagerag_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, Embedder};
use pagerag_core::models::{Chunk, ChunkId, Metadata, ScoredChunk, ID_KEY};
use pagerag_core::store::{rank_top_k, VectorIndex};
use pagerag_core::{RagError, Result};

pub struct SqliteIndex {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl SqliteIndex {
    pub fn new(
        pool: SqlitePool,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            pool,
            collection: collection.into(),
            embedder,
            batch_size: 64,
        }
    }

    /// Number of texts sent to the embedder per call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self.embedder.embed(batch).await?;
            if embedded.len() != batch.len() {
                return Err(RagError::EmbeddingFailure(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn existing_ids(&self) -> Result<HashSet<ChunkId>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM chunks WHERE collection = ?")
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::store)?;
        Ok(ids.into_iter().collect())
    }

    async fn content_hashes(&self, ids: &[ChunkId]) -> Result<HashMap<ChunkId, String>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let rows = sqlx::query("SELECT id, content_hash FROM chunks WHERE collection = ?")
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::store)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id: String = row.get("id");
                if wanted.contains(id.as_str()) {
                    Some((id, row.get("content_hash")))
                } else {
                    None
                }
            })
            .collect())
    }

    async fn add(&self, chunks: &[Chunk]) -> Result<usize> {
        let mut ids = Vec::with_capacity(chunks.len());
        for (position, chunk) in chunks.iter().enumerate() {
            let id = chunk.id().ok_or(RagError::MissingIdentityKey {
                position,
                key: ID_KEY,
            })?;
            ids.push(id);
        }
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embed_all(&texts).await?;
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(RagError::store)?;
        let mut written = 0usize;
        for ((id, chunk), vector) in ids.iter().zip(chunks).zip(&vectors) {
            let metadata_json = serde_json::to_string(&chunk.metadata).map_err(RagError::store)?;
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO chunks
                    (id, collection, content, metadata_json, content_hash, embedding, indexed_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(*id)
            .bind(&self.collection)
            .bind(&chunk.content)
            .bind(&metadata_json)
            .bind(chunk.content_hash())
            .bind(vec_to_blob(vector))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(RagError::store)?;
            written += result.rows_affected() as usize;
        }
        tx.commit().await.map_err(RagError::store)?;

        Ok(written)
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed_query(query).await?;

        let rows = sqlx::query(
            "SELECT content, metadata_json, embedding FROM chunks WHERE collection = ? ORDER BY rowid",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::store)?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let metadata_json: String = row.get("metadata_json");
            let metadata: Metadata =
                serde_json::from_str(&metadata_json).map_err(RagError::store)?;
            let blob: Vec<u8> = row.get("embedding");
            hits.push(ScoredChunk {
                chunk: Chunk::new(row.get::<String, _>("content"), metadata),
                score: cosine_similarity(&query_vec, &blob_to_vec(&blob)),
            });
        }
        Ok(rank_top_k(hits, k))
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::store)?;
        Ok(n as usize)
    }
}
