//! # pagerag
//!
//! Incremental page-aware document indexing and retrieval-augmented
//! question answering over local models.
//!
//! Documents (PDF pages, text files) are split into overlapping chunks, each
//! chunk gets a stable id `"{source}:{page}:{index}"`, and only chunks whose
//! id is not already stored get embedded and written. Questions are answered
//! by retrieving the most similar chunks and handing them to a generation
//! model inside a two-part prompt.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   ┌─────────────────────┐   ┌───────────────┐
//! │ DirectoryLoader │──▶│ split + assign ids  │──▶│ SqliteIndex   │
//! │ PDF pages, text │   │ IncrementalIndexer  │   │ chunks.sqlite │
//! └─────────────────┘   └─────────────────────┘   └───────┬───────┘
//!                                                         │ top-k
//!                       ┌─────────────────────┐           │
//!        question ─────▶│ QueryEngine         │◀──────────┘
//!                       │ context + prompt    │──▶ Ollama ──▶ answer
//!                       └─────────────────────┘
//! ```
//!
//! The pipelines themselves live in `pagerag-core`; this crate supplies the
//! concrete collaborators and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | tracing subscriber setup |
//! | [`loader`] | Directory walker producing documents |
//! | [`db`] | Store directory, SQLite connection, schema, reset |
//! | [`sqlite_store`] | SQLite vector index |
//! | [`embedding`] | Ollama, OpenAI, and local embedders |
//! | [`generate`] | Ollama generator |
//! | [`ingest`] | `pagerag ingest` |
//! | [`query`] | `pagerag query` |
//! | [`stats`] | `pagerag stats` |
//! | [`chat`] | `pagerag chat` |

pub mod chat;
pub mod config;
pub mod db;
pub mod embedding;
pub mod generate;
pub mod ingest;
pub mod loader;
pub mod logging;
pub mod query;
pub mod sqlite_store;
pub mod stats;
