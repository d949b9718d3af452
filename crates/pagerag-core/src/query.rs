//! Retrieval-augmented query engine.
//!
//! One query is a fixed sequence of awaited calls:
//!
//! 1. [`VectorIndex::similarity_search`] for the top `k` chunks (the index
//!    embeds the question itself).
//! 2. [`build_context`] joins their text in rank order.
//! 3. [`PromptTemplate::render`] fills `{context}` and `{question}`.
//! 4. [`Generator::invoke`] produces the answer, returned unmodified.
//!
//! An empty store is not an error: the prompt is still sent with an empty
//! context.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::generate::Generator;
use crate::models::{ChunkId, ScoredChunk};
use crate::prompt::PromptTemplate;
use crate::store::VectorIndex;

/// Separator placed between retrieved chunks in the prompt context.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

pub const DEFAULT_TOP_K: usize = 5;

/// A generated answer together with what it was generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Model output, untouched.
    pub text: String,
    /// Ids of the retrieved chunks, best match first. Chunks without an id
    /// are reported as `None`.
    pub sources: Vec<Option<ChunkId>>,
    /// The exact prompt sent to the generator.
    pub prompt: String,
}

/// Join chunk contents in rank order with [`CONTEXT_DELIMITER`].
///
/// ```rust
/// use pagerag_core::models::{Chunk, Metadata, ScoredChunk};
/// use pagerag_core::query::build_context;
///
/// let hits = vec![
///     ScoredChunk { chunk: Chunk::new("first", Metadata::new()), score: 0.9 },
///     ScoredChunk { chunk: Chunk::new("second", Metadata::new()), score: 0.4 },
/// ];
/// assert_eq!(build_context(&hits), "first\n\n---\n\nsecond");
/// assert_eq!(build_context(&[]), "");
/// ```
pub fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|h| h.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

pub struct QueryEngine {
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn Generator>,
    template: PromptTemplate,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(index: Arc<dyn VectorIndex>, generator: Arc<dyn Generator>) -> Self {
        Self {
            index,
            generator,
            template: PromptTemplate::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve, assemble, and generate.
    pub async fn query(&self, question: &str) -> Result<Answer> {
        let hits = self.index.similarity_search(question, self.top_k).await?;
        debug!(retrieved = hits.len(), k = self.top_k, "similarity search");

        let context = build_context(&hits);
        let prompt = self.template.render(&context, question);
        let text = self.generator.invoke(&prompt).await?;

        Ok(Answer {
            text,
            sources: hits
                .iter()
                .map(|h| h.chunk.id().map(str::to_string))
                .collect(),
            prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::error::RagError;
    use crate::identity::assign_chunk_ids;
    use crate::models::{Chunk, Document};
    use crate::store::memory::InMemoryIndex;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// One-hot on the first letter: texts sharing a first letter are identical.
    struct FirstLetter;

    #[async_trait]
    impl Embedder for FirstLetter {
        fn model_name(&self) -> &str {
            "first-letter"
        }
        fn dims(&self) -> usize {
            27
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 27];
                    match t.bytes().next() {
                        Some(b) if b.is_ascii_lowercase() => v[(b - b'a') as usize] = 1.0,
                        _ => v[26] = 1.0,
                    }
                    v
                })
                .collect())
        }
    }

    /// Records every prompt and echoes a fixed answer.
    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for Recorder {
        fn model_name(&self) -> &str {
            "recorder"
        }
        async fn invoke(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("  answer  ".to_string())
        }
    }

    struct TimesOut;

    #[async_trait]
    impl Generator for TimesOut {
        fn model_name(&self) -> &str {
            "slow"
        }
        async fn invoke(&self, _prompt: &str) -> Result<String> {
            Err(RagError::GenerationTimeout { secs: 1 })
        }
    }

    async fn seeded(texts: &[&str]) -> Arc<dyn VectorIndex> {
        let index = InMemoryIndex::new(Arc::new(FirstLetter));
        let meta = Document::new("", "a.pdf").with_page_label("1").metadata;
        let chunks =
            assign_chunk_ids(texts.iter().map(|t| Chunk::new(*t, meta.clone())).collect())
                .unwrap();
        index.add(&chunks).await.unwrap();
        Arc::new(index)
    }

    fn simple_template() -> PromptTemplate {
        PromptTemplate::new("sys", "{context}|{question}").unwrap()
    }

    #[tokio::test]
    async fn test_empty_store_still_sends_prompt() {
        let generator = Arc::new(Recorder::default());
        let engine = QueryEngine::new(seeded(&[]).await, generator.clone())
            .with_template(simple_template());

        let answer = engine.query("q").await.unwrap();
        assert!(answer.sources.is_empty());
        assert_eq!(answer.prompt, "System: sys\nHuman: |q");
        assert_eq!(generator.prompts.lock().unwrap().as_slice(), ["System: sys\nHuman: |q"]);
    }

    #[tokio::test]
    async fn test_answer_returned_unmodified() {
        let engine = QueryEngine::new(seeded(&["apple"]).await, Arc::new(Recorder::default()));
        assert_eq!(engine.query("a").await.unwrap().text, "  answer  ");
    }

    #[tokio::test]
    async fn test_context_in_rank_order_with_delimiter() {
        let index = seeded(&["banana", "apple", "avocado"]).await;
        let engine = QueryEngine::new(index, Arc::new(Recorder::default()))
            .with_template(simple_template())
            .with_top_k(2);

        let answer = engine.query("a").await.unwrap();
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(
            answer.sources,
            vec![Some("a.pdf:1:1".to_string()), Some("a.pdf:1:2".to_string())]
        );
        assert_eq!(answer.prompt, "System: sys\nHuman: apple\n\n---\n\navocado|a");
    }

    #[tokio::test]
    async fn test_default_k_caps_results() {
        let texts = ["a1", "a2", "a3", "a4", "a5", "a6", "a7"];
        let engine = QueryEngine::new(seeded(&texts).await, Arc::new(Recorder::default()));
        assert_eq!(engine.top_k(), DEFAULT_TOP_K);
        let answer = engine.query("a").await.unwrap();
        assert_eq!(answer.sources.len(), 5);
    }

    #[tokio::test]
    async fn test_generation_timeout_propagates() {
        let engine = QueryEngine::new(seeded(&["apple"]).await, Arc::new(TimesOut));
        let err = engine.query("a").await.unwrap_err();
        assert!(matches!(err, RagError::GenerationTimeout { secs: 1 }));
    }
}
