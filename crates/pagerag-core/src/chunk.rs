//! Recursive character text splitter.
//!
//! Splits document text into overlapping chunks of at most `chunk_size`
//! characters, preferring paragraph breaks, then line breaks, then spaces,
//! and only falling back to single characters for unbroken runs.
//!
//! # Algorithm
//!
//! 1. Pick the first separator of `["\n\n", "\n", " ", ""]` that occurs in
//!    the text.
//! 2. Split on it, keeping the separator attached to the start of the piece
//!    that follows it.
//! 3. Pieces shorter than `chunk_size` are buffered and merged greedily into
//!    chunks. When a chunk is emitted, pieces are dropped from the front of
//!    the buffer until at most `chunk_overlap` characters remain, and those
//!    carry over into the next chunk.
//! 4. Pieces that are too long are split again with the remaining
//!    separators.
//! 5. Every chunk is trimmed; empty chunks are dropped.
//!
//! Lengths are counted in `char`s, never bytes, so multi-byte text never
//! splits inside a code point.
//!
//! # Example
//!
//! ```rust
//! use pagerag_core::chunk::{RecursiveCharacterSplitter, Splitter};
//!
//! let splitter = RecursiveCharacterSplitter::new(10, 5);
//! let chunks = splitter.split_text("one two three four five six");
//! assert_eq!(chunks, vec!["one two", "two three", "four five", "five six"]);
//! ```

use std::collections::VecDeque;

use tracing::warn;

use crate::models::{Chunk, Document};

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 80;
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Turns documents into ordered chunks.
///
/// Implementations must be deterministic: the same documents always yield
/// the same chunks in the same order, otherwise chunk ids drift between
/// ingestion runs.
pub trait Splitter: Send + Sync {
    /// Split a single text into chunk strings, in order.
    fn split_text(&self, text: &str) -> Vec<String>;

    /// Split every document, copying its metadata into each of its chunks.
    /// Output order is document order, then in-document order.
    fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.content)
                    .into_iter()
                    .map(move |text| Chunk::new(text, doc.metadata.clone()))
            })
            .collect()
    }
}

/// Length-based splitter that recurses through a list of separators.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default separators.
    ///
    /// `chunk_overlap` should be smaller than `chunk_size`; configuration
    /// loading rejects anything else.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().cloned().unwrap_or_default();
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep.clone();
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep.clone();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut buffered: Vec<String> = Vec::new();

        for piece in split_keeping_separator(text, &separator) {
            if char_len(&piece) < self.chunk_size {
                buffered.push(piece);
                continue;
            }
            if !buffered.is_empty() {
                chunks.extend(self.merge_splits(&buffered, ""));
                buffered.clear();
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !buffered.is_empty() {
            chunks.extend(self.merge_splits(&buffered, ""));
        }
        chunks
    }

    /// Greedily merge small pieces into chunks with overlap carry-over.
    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);
            let joiner = if current.is_empty() { 0 } else { sep_len };

            if total + len + joiner > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        chunk_len = total,
                        chunk_size = self.chunk_size,
                        "created a chunk longer than the configured size"
                    );
                }
                if !current.is_empty() {
                    if let Some(doc) = join_pieces(&current, separator) {
                        docs.push(doc);
                    }
                    loop {
                        let joiner = if current.is_empty() { 0 } else { sep_len };
                        let over_overlap = total > self.chunk_overlap;
                        let still_too_big = total + len + joiner > self.chunk_size && total > 0;
                        if !(over_overlap || still_too_big) {
                            break;
                        }
                        let extra = if current.len() > 1 { sep_len } else { 0 };
                        match current.pop_front() {
                            Some(first) => total = total.saturating_sub(char_len(first) + extra),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece.as_str());
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        if let Some(doc) = join_pieces(&current, separator) {
            docs.push(doc);
        }
        docs
    }
}

impl Default for RecursiveCharacterSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Splitter for RecursiveCharacterSplitter {
    fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on a literal separator, gluing each separator onto the start of
/// the piece after it. Empty pieces are dropped. An empty separator splits
/// into single characters.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut parts = text.split(separator);
    let mut pieces = Vec::new();
    if let Some(first) = parts.next() {
        pieces.push(first.to_string());
    }
    for part in parts {
        pieces.push(format!("{}{}", separator, part));
    }
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn join_pieces(pieces: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
