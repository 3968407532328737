//! Client for OpenAI-compatible `/chat/completions` and `/embeddings` endpoints.

use async_trait::async_trait;
use domain::ports::{CompletionProvider, EmbeddingProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::types::{AppError, Result};
use std::sync::Arc;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn new(
        client: Arc<Client>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
        }
    }

    fn request_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response = self
            .client
            .post(self.request_url("/embeddings"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(AppError::embedding)?;
        let status = response.status();
        let body = response.text().await.map_err(AppError::embedding)?;
        if !status.is_success() {
            return Err(AppError::embedding(format!("OpenAI API error ({status}): {body}")));
        }
        parse_embedding_body(&body)
    }

    pub async fn generate_response(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };
        let response = self
            .client
            .post(self.request_url("/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(AppError::completion)?;
        let status = response.status();
        let body = response.text().await.map_err(AppError::completion)?;
        if !status.is_success() {
            return Err(AppError::completion(format!("OpenAI API error ({status}): {body}")));
        }
        parse_completion_body(&body)
    }
}

fn parse_embedding_body(body: &str) -> Result<Vec<f32>> {
    let parsed: EmbeddingResponse = serde_json::from_str(body).map_err(AppError::embedding)?;
    parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| AppError::embedding("no embedding in response"))
}

fn parse_completion_body(body: &str) -> Result<String> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(AppError::completion)?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| AppError::completion("no choices in response"))
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generate_embedding(text).await
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.generate_response(prompt).await
    }

    fn model_name(&self) -> &str {
        &self.chat_model
    }
}
