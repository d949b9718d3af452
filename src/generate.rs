//! Text generation via Ollama.
//!
//! [`OllamaGenerator`] calls `POST {url}/api/generate` with `stream: false`
//! and returns the `response` field verbatim. The whole call is bounded by
//! `[generation].timeout_secs`; running out of time is reported as
//! [`RagError::GenerationTimeout`], every other failure as
//! [`RagError::GenerationFailure`]. Nothing is retried.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use pagerag_core::generate::Generator;
use pagerag_core::RagError;

use crate::config::GenerationConfig;

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    system: Option<String>,
    timeout_secs: u64,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.base_url().trim_end_matches('/').to_string(),
            model: config.model.clone(),
            system: None,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Send `system` as Ollama's system message with every prompt.
    pub fn with_system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        if let Some(system) = &self.system {
            body["system"] = serde_json::Value::String(system.clone());
        }
        body
    }

    fn classify(&self, err: reqwest::Error) -> RagError {
        if err.is_timeout() {
            RagError::GenerationTimeout {
                secs: self.timeout_secs,
            }
        } else {
            RagError::generation(format!(
                "Ollama connection error (is Ollama running at {}?): {}",
                self.url, err
            ))
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &str) -> pagerag_core::Result<String> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::generation(format!(
                "Ollama API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| self.classify(e))?;
        parse_generate_response(&json)
    }
}

fn parse_generate_response(json: &serde_json::Value) -> pagerag_core::Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| RagError::generation("Invalid Ollama response: missing response field"))
}

/// Build the generator named by `[generation].provider`.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
