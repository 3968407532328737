//! Capability interfaces the pipeline depends on.
//!
//! Concrete providers live in the infrastructure crate; tests substitute their own.

use async_trait::async_trait;
use shared::types::Result;

use crate::models::ScoredChunk;

/// Similarity search over stored chunks.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Returns at most `k` chunks ordered by descending relevance.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;
}

/// Text to vector conversion.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn model_name(&self) -> &str;
}

/// Single-turn completion against a hosted chat model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}
