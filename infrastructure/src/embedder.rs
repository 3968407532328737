use domain::models::Embedding;
use domain::ports::EmbeddingProvider;
use futures::stream::{self, StreamExt};
use shared::types::Result;
use std::collections::HashMap;
use std::sync::Arc;

const BATCH_SIZE: usize = 32;
const MAX_IN_FLIGHT: usize = 8;

/// Batch embedding for ingestion.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub id: String,
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Output order matches `inputs`.
    pub async fn generate_embeddings(&self, inputs: &[EmbeddingInput]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(inputs.len());

        for chunk in inputs.chunks(BATCH_SIZE) {
            tracing::debug!(
                batch = chunk.len(),
                model = self.provider.model_name(),
                "Generating embeddings"
            );
            let batch_embeddings = self.generate_batch_embeddings(chunk).await?;
            embeddings.extend(batch_embeddings);
        }
        Ok(embeddings)
    }

    async fn generate_batch_embeddings(&self, inputs: &[EmbeddingInput]) -> Result<Vec<Embedding>> {
        let futures: Vec<_> = inputs
            .iter()
            .map(|input| {
                let provider = &self.provider;
                async move {
                    let vector = provider.embed(&input.text).await?;
                    Ok(Embedding {
                        id: input.id.clone(),
                        vector,
                        text: input.text.clone(),
                        metadata: input.metadata.clone(),
                    }) as Result<Embedding>
                }
            })
            .collect();

        let results = stream::iter(futures)
            .buffered(MAX_IN_FLIGHT)
            .collect::<Vec<_>>()
            .await;

        results.into_iter().collect()
    }
}
