//! Text-generation model trait.

use async_trait::async_trait;

use crate::error::Result;

/// One prompt in, one string out.
///
/// Implementations should bound the call with a timeout and report it as
/// [`RagError::GenerationTimeout`](crate::RagError::GenerationTimeout);
/// every other failure is a
/// [`RagError::GenerationFailure`](crate::RagError::GenerationFailure).
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier (e.g. `"gemma3:1b"`).
    fn model_name(&self) -> &str;

    /// Generate a completion for a fully resolved prompt.
    async fn invoke(&self, prompt: &str) -> Result<String>;
}
