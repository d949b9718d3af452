//! Stable chunk identity.
//!
//! Every chunk gets an id `"{source}:{page}:{index}"`. The index counts
//! successive chunks of the same `(source, page)` pair and restarts at 0
//! whenever the page id differs from the immediately preceding chunk's.
//! Grouping is by adjacency only: a page whose chunks reappear after a
//! different page starts a new run at 0.
//!
//! For a fixed corpus and splitter the ids come out byte-identical in
//! byte-identical order on every run, which is what lets the indexer skip
//! chunks it has already stored.
//!
//! # Example
//!
//! ```rust
//! use pagerag_core::identity::assign_chunk_ids;
//! use pagerag_core::models::{Chunk, Document};
//!
//! let doc = Document::new("", "a.pdf").with_page_label("1");
//! let chunks = vec![
//!     Chunk::new("X", doc.metadata.clone()),
//!     Chunk::new("Y", doc.metadata.clone()),
//! ];
//! let chunks = assign_chunk_ids(chunks).unwrap();
//! assert_eq!(chunks[0].id(), Some("a.pdf:1:0"));
//! assert_eq!(chunks[1].id(), Some("a.pdf:1:1"));
//! ```

use serde_json::Value;

use crate::error::{RagError, Result};
use crate::models::{Chunk, ChunkId, Metadata, ID_KEY, PAGE_LABEL_KEY, SOURCE_KEY};

/// Page component used when a chunk has no `page_label`.
pub const MISSING_PAGE: &str = "None";

/// Accumulator threaded through the identity fold.
#[derive(Debug, Default, Clone)]
pub struct IdCursor {
    last_page_id: Option<String>,
    current_chunk_index: usize,
}

impl IdCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance past one chunk on `page_id` and return its id.
    pub fn next_id(&mut self, page_id: String) -> ChunkId {
        if self.last_page_id.as_deref() == Some(page_id.as_str()) {
            self.current_chunk_index += 1;
        } else {
            self.current_chunk_index = 0;
        }
        let id = format!("{}:{}", page_id, self.current_chunk_index);
        self.last_page_id = Some(page_id);
        id
    }
}

/// Compute the `"{source}:{page}"` grouping key for a chunk's metadata.
///
/// `position` is only used to report which chunk failed.
pub fn page_id(metadata: &Metadata, position: usize) -> Result<String> {
    let source = metadata
        .get(SOURCE_KEY)
        .and_then(render_key)
        .ok_or(RagError::MissingIdentityKey {
            position,
            key: SOURCE_KEY,
        })?;
    let page = metadata
        .get(PAGE_LABEL_KEY)
        .and_then(render_key)
        .unwrap_or_else(|| MISSING_PAGE.to_string());
    Ok(format!("{}:{}", source, page))
}

fn render_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Assign ids to chunks in splitter output order, writing each into
/// `metadata["id"]`.
///
/// Fails with [`RagError::MissingIdentityKey`] on the first chunk without a
/// `source`; no partial result is returned.
pub fn assign_chunk_ids(chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
    let mut cursor = IdCursor::new();
    chunks
        .into_iter()
        .enumerate()
        .map(|(position, mut chunk)| {
            let id = cursor.next_id(page_id(&chunk.metadata, position)?);
            chunk.metadata.insert(ID_KEY.to_string(), Value::String(id));
            Ok(chunk)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    fn chunk(source: &str, page: Option<&str>, text: &str) -> Chunk {
        let mut doc = Document::new("", source);
        if let Some(p) = page {
            doc = doc.with_page_label(p);
        }
        Chunk::new(text, doc.metadata)
    }

    fn ids(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.id().unwrap()).collect()
    }

    #[test]
    fn test_indices_increase_within_page() {
        let chunks = vec![
            chunk("a.pdf", Some("1"), "X"),
            chunk("a.pdf", Some("1"), "Y"),
            chunk("a.pdf", Some("1"), "Z"),
        ];
        let out = assign_chunk_ids(chunks).unwrap();
        assert_eq!(ids(&out), vec!["a.pdf:1:0", "a.pdf:1:1", "a.pdf:1:2"]);
    }

    #[test]
    fn test_new_page_resets_index() {
        let chunks = vec![
            chunk("a.pdf", Some("1"), "X"),
            chunk("a.pdf", Some("1"), "Y"),
            chunk("a.pdf", Some("2"), "Z"),
            chunk("b.pdf", Some("2"), "W"),
        ];
        let out = assign_chunk_ids(chunks).unwrap();
        assert_eq!(
            ids(&out),
            vec!["a.pdf:1:0", "a.pdf:1:1", "a.pdf:2:0", "b.pdf:2:0"]
        );
    }

    #[test]
    fn test_adjacency_only_grouping_restarts_numbering() {
        let chunks = vec![
            chunk("a.pdf", Some("1"), "X"),
            chunk("a.pdf", Some("1"), "Y"),
            chunk("a.pdf", Some("2"), "Z"),
            chunk("a.pdf", Some("1"), "W"),
        ];
        let out = assign_chunk_ids(chunks).unwrap();
        assert_eq!(
            ids(&out),
            vec!["a.pdf:1:0", "a.pdf:1:1", "a.pdf:2:0", "a.pdf:1:0"]
        );
    }

    #[test]
    fn test_two_documents_same_page_are_one_run() {
        // Two separate documents that share (source, page) and are adjacent
        // continue the same numbering run.
        let chunks = vec![
            chunk("a.pdf", Some("1"), "X"),
            chunk("a.pdf", Some("1"), "X2"),
            chunk("a.pdf", Some("1"), "Y"),
            chunk("a.pdf", Some("1"), "Y2"),
        ];
        let out = assign_chunk_ids(chunks).unwrap();
        assert_eq!(
            ids(&out),
            vec!["a.pdf:1:0", "a.pdf:1:1", "a.pdf:1:2", "a.pdf:1:3"]
        );
    }

    #[test]
    fn test_missing_page_uses_sentinel() {
        let out = assign_chunk_ids(vec![
            chunk("notes.txt", None, "X"),
            chunk("notes.txt", None, "Y"),
        ])
        .unwrap();
        assert_eq!(ids(&out), vec!["notes.txt:None:0", "notes.txt:None:1"]);
    }

    #[test]
    fn test_missing_source_fails() {
        let good = chunk("a.pdf", Some("1"), "X");
        let bad = Chunk::new("Y", Metadata::new());
        let err = assign_chunk_ids(vec![good, bad]).unwrap_err();
        match err {
            RagError::MissingIdentityKey { position, key } => {
                assert_eq!(position, 1);
                assert_eq!(key, "source");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_source_counts_as_missing() {
        let mut meta = Metadata::new();
        meta.insert(SOURCE_KEY.to_string(), Value::Null);
        let err = assign_chunk_ids(vec![Chunk::new("x", meta)]).unwrap_err();
        assert!(matches!(err, RagError::MissingIdentityKey { position: 0, .. }));
    }

    #[test]
    fn test_numeric_page_label_renders() {
        let mut meta = Document::new("", "a.pdf").metadata;
        meta.insert(PAGE_LABEL_KEY.to_string(), Value::from(7));
        let out = assign_chunk_ids(vec![Chunk::new("x", meta)]).unwrap();
        assert_eq!(out[0].id(), Some("a.pdf:7:0"));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let make = || {
            vec![
                chunk("a.pdf", Some("1"), "X"),
                chunk("a.pdf", Some("2"), "Y"),
                chunk("a.pdf", Some("2"), "Z"),
            ]
        };
        let first = assign_chunk_ids(make()).unwrap();
        let second = assign_chunk_ids(make()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_preserves_order_and_content() {
        let out = assign_chunk_ids(vec![
            chunk("a.pdf", Some("1"), "first"),
            chunk("a.pdf", Some("1"), "second"),
        ])
        .unwrap();
        assert_eq!(out[0].content, "first");
        assert_eq!(out[1].content, "second");
    }
}
