use super::embedding_storage::EmbeddingStorage;
use super::search::SearchEngine;
use async_trait::async_trait;
use domain::models::ScoredChunk;
use domain::ports::{EmbeddingProvider, VectorSearch};
use shared::types::{AppError, Result};
use std::sync::Arc;

/// Query-time view of the store: embeds the query, then ranks stored chunks.
#[derive(Clone)]
pub struct VectorIndex {
    storage: Arc<EmbeddingStorage>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorIndex {
    pub fn new(storage: Arc<EmbeddingStorage>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { storage, embedder }
    }
}

#[async_trait]
impl VectorSearch for VectorIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || -> Result<Vec<ScoredChunk>> {
            let all_embeddings = storage.get_all_embeddings()?;
            tracing::debug!(candidates = all_embeddings.len(), k, "Ranking stored chunks");
            Ok(SearchEngine::find_relevant_chunks(&query_embedding, all_embeddings, k))
        })
        .await
        .map_err(AppError::store)?
    }
}
