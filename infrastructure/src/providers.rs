use super::config::{Config, Provider};
use super::ollama_client::OllamaClient;
use super::openai_client::OpenAiClient;
use domain::ports::{CompletionProvider, EmbeddingProvider};
use reqwest::Client;
use shared::types::{AppError, Result};
use std::sync::Arc;

/// Embedding and completion clients selected by `LLM_PROVIDER`.
#[derive(Clone)]
pub struct Providers {
    pub embedding: Arc<dyn EmbeddingProvider>,
    pub completion: Arc<dyn CompletionProvider>,
}

impl Providers {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(Client::new());
        match config.provider {
            Provider::OpenAi => {
                let api_key = config
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| AppError::config("OPENAI_API_KEY is not set"))?;
                let openai = Arc::new(OpenAiClient::new(
                    client,
                    config.openai_base_url.clone(),
                    api_key,
                    config.openai_chat_model.clone(),
                    config.openai_embedding_model.clone(),
                ));
                Ok(Self {
                    embedding: openai.clone(),
                    completion: openai,
                })
            }
            Provider::Ollama => {
                let ollama = Arc::new(OllamaClient::new(
                    client,
                    config.ollama_base_url.clone(),
                    config.ollama_model.clone(),
                    config.ollama_embedding_model.clone(),
                ));
                Ok(Self {
                    embedding: ollama.clone(),
                    completion: ollama,
                })
            }
        }
    }
}
