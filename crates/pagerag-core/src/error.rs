//! Error taxonomy shared by both pipelines.
//!
//! Every failure of an external collaborator is propagated to the caller
//! unchanged; nothing here is retried or swallowed. An empty retrieval is
//! not an error and has no variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// A chunk lacks the metadata key its identity is computed from.
    #[error("chunk {position} is missing required metadata key '{key}'")]
    MissingIdentityKey { position: usize, key: &'static str },

    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("generation failed: {0}")]
    GenerationFailure(String),

    #[error("generation timed out after {secs}s")]
    GenerationTimeout { secs: u64 },

    #[error("invalid prompt template: {0}")]
    InvalidTemplate(String),
}

impl RagError {
    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        RagError::StoreUnavailable(err.to_string())
    }

    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        RagError::EmbeddingFailure(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        RagError::GenerationFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
