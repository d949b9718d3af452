//! # pagerag core
//!
//! Runtime-free logic for pagerag: data models, chunk identity, text
//! splitting, the vector store and model traits, incremental indexing, and
//! the retrieval-augmented query engine.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. Concrete
//! collaborators (SQLite store, Ollama/OpenAI providers, PDF loader) live in
//! the `pagerag` application crate and plug in through the traits exported
//! here.
//!
//! ## Pipelines
//!
//! ```text
//! ingest:  DocumentSource ─▶ Splitter ─▶ assign_chunk_ids ─▶ IncrementalIndexer ─▶ VectorIndex
//! query:   question ─▶ VectorIndex::similarity_search ─▶ build_context ─▶ PromptTemplate ─▶ Generator
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod identity;
pub mod indexer;
pub mod models;
pub mod prompt;
pub mod query;
pub mod source;
pub mod store;

pub use error::{RagError, Result};
