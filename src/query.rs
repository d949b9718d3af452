//! `pagerag query`: retrieval-augmented answer to one question.

use anyhow::Result;
use std::sync::Arc;

use pagerag_core::embedding::Embedder;
use pagerag_core::generate::Generator;
use pagerag_core::query::{Answer, QueryEngine};
use pagerag_core::store::memory::InMemoryIndex;
use pagerag_core::store::VectorIndex;
use tracing::debug;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::generate::create_generator;
use crate::sqlite_store::SqliteIndex;

/// Answer `question` from the configured store and print the response.
pub async fn run_query(config: &Config, question: &str, show_sources: bool) -> Result<Answer> {
    let embedder = create_embedder(&config.embedding)?;
    let generator = create_generator(&config.generation)?;
    let answer = answer_with(config, embedder, generator, question).await?;

    println!("Response: {}", answer.text);
    if show_sources {
        println!("Sources: {}", format_sources(&answer));
    }
    Ok(answer)
}

/// Answer with explicit collaborators. Does not print.
pub async fn answer_with(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    question: &str,
) -> Result<Answer> {
    let pool = db::open_existing(&config.store).await?;
    let index: Arc<dyn VectorIndex> = match &pool {
        Some(pool) => Arc::new(SqliteIndex::new(
            pool.clone(),
            config.store.collection.clone(),
            embedder,
        )),
        None => {
            debug!(path = %config.store.path.display(), "no store yet, querying with empty context");
            Arc::new(InMemoryIndex::new(embedder))
        }
    };
    let engine = QueryEngine::new(index, generator)
        .with_template(config.prompt.template()?)
        .with_top_k(config.retrieval.k);

    let result = engine.query(question).await;
    if let Some(pool) = pool {
        pool.close().await;
    }
    Ok(result?)
}

/// `[id, id, None]`, matching the order of retrieval.
pub fn format_sources(answer: &Answer) -> String {
    let items: Vec<String> = answer
        .sources
        .iter()
        .map(|s| match s {
            Some(id) => format!("'{}'", id),
            None => "None".to_string(),
        })
        .collect();
    format!("[{}]", items.join(", "))
}
