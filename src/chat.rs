//! `pagerag chat`: one message straight to the generation model.
//!
//! No retrieval and no RAG template; the configured
//! `[generation].system_prompt` is sent as the system message.

use anyhow::Result;

use pagerag_core::generate::Generator;

use crate::config::Config;
use crate::generate::OllamaGenerator;

pub async fn run_chat(config: &Config, message: &str) -> Result<String> {
    let generator =
        OllamaGenerator::new(&config.generation)?.with_system(config.generation.system_prompt.clone());
    let reply = generator.invoke(message).await?;
    println!("{}", reply);
    Ok(reply)
}
