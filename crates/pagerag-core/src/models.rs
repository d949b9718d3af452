//! Core data models flowing through the ingestion and query pipelines.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Metadata key holding the path or name the text came from.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the human page label (1-based for PDFs).
pub const PAGE_LABEL_KEY: &str = "page_label";
/// Metadata key the identity assigner writes the chunk id into.
pub const ID_KEY: &str = "id";

/// Ordered string-keyed metadata. A `BTreeMap` keeps serialization stable
/// between runs.
pub type Metadata = BTreeMap<String, Value>;

/// Stable chunk identity of the form `"{source}:{page}:{index}"`.
pub type ChunkId = String;

/// A loaded document (a whole text file or a single PDF page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), Value::String(source.into()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn with_page_label(mut self, label: impl Into<String>) -> Self {
        self.metadata
            .insert(PAGE_LABEL_KEY.to_string(), Value::String(label.into()));
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// A span of document text produced by a [`Splitter`](crate::chunk::Splitter).
///
/// The metadata is inherited from the parent document. After
/// [`assign_chunk_ids`](crate::identity::assign_chunk_ids) it also carries
/// the chunk id under [`ID_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// The assigned chunk id, if identity assignment has run.
    pub fn id(&self) -> Option<&str> {
        self.metadata.get(ID_KEY).and_then(Value::as_str)
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }

    /// SHA-256 of the chunk text, hex encoded.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// One retrieval hit. Higher `score` means more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}
