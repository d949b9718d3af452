//! Configuration parsing and validation.
//!
//! pagerag is configured by a single TOML file (default
//! `./config/pagerag.toml`). Every section and field has a default, so an
//! empty file or no file at all gives a working local setup: PDFs under
//! `./data`, the store under `./store`, Ollama on `localhost:11434`.
//!
//! ```toml
//! [store]
//! path = "./store"
//! collection = "chunks"
//!
//! [documents]
//! root = "./data"
//! include_globs = ["**/*.pdf"]
//!
//! [chunking]
//! chunk_size = 800
//! chunk_overlap = 80
//!
//! [retrieval]
//! k = 5
//!
//! [embedding]
//! provider = "ollama"
//! model = "nomic-embed-text"
//!
//! [generation]
//! model = "gemma3:1b"
//! timeout_secs = 120
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use pagerag_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use pagerag_core::prompt::{PromptTemplate, DEFAULT_HUMAN_PROMPT, DEFAULT_SYSTEM_PROMPT};
use pagerag_core::query::DEFAULT_TOP_K;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

/// Where the vector store lives. `path` is a directory; a reset deletes it
/// recursively.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./store")
}
fn default_collection() -> String {
    "chunks".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    #[serde(default = "default_documents_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            root: default_documents_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_documents_root() -> PathBuf {
    PathBuf::from("./data")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: DEFAULT_TOP_K }
    }
}

fn default_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            url: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    /// System message for `pagerag chat`.
    #[serde(default = "default_chat_system_prompt")]
    pub system_prompt: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            url: None,
            timeout_secs: default_generation_timeout(),
            system_prompt: default_chat_system_prompt(),
        }
    }
}

fn default_generation_provider() -> String {
    "ollama".to_string()
}
fn default_generation_model() -> String {
    "gemma3:1b".to_string()
}
fn default_generation_timeout() -> u64 {
    120
}
fn default_chat_system_prompt() -> Option<String> {
    Some("Give the answer in a single sentence".to_string())
}

/// The two RAG prompt messages. Both may use `{context}` and `{question}`.
#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_system")]
    pub system: String,
    #[serde(default = "default_human")]
    pub human: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system: default_system(),
            human: default_human(),
        }
    }
}

fn default_system() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}
fn default_human() -> String {
    DEFAULT_HUMAN_PROMPT.to_string()
}

impl PromptConfig {
    pub fn template(&self) -> Result<PromptTemplate> {
        Ok(PromptTemplate::new(self.system.clone(), self.human.clone())?)
    }
}

impl EmbeddingConfig {
    pub fn base_url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }
}

impl GenerationConfig {
    pub fn base_url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }
}

/// Read and validate a config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }

    if config.retrieval.k < 1 {
        bail!("retrieval.k must be >= 1");
    }

    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0 when set");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    match config.embedding.provider.as_str() {
        "ollama" | "local" => {}
        "openai" => {
            if config.embedding.model.is_none() {
                bail!("embedding.model must be specified when provider is 'openai'");
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be ollama, openai, or local.",
            other
        ),
    }

    match config.generation.provider.as_str() {
        "ollama" => {}
        other => bail!("Unknown generation provider: '{}'. Must be ollama.", other),
    }

    config
        .prompt
        .template()
        .context("Invalid [prompt] section")?;

    Ok(())
}
