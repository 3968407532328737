use domain::models::{Embedding, RetrievedChunk, ScoredChunk};
use rayon::prelude::*;

pub struct SearchEngine;

impl SearchEngine {
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot_product / (norm_a * norm_b)
    }

    /// Relevance in `[0, 1]`: `1 - d / sqrt(2)` where `d` is the squared
    /// Euclidean distance between the unit-normalized vectors.
    pub fn relevance(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.iter().all(|x| *x == 0.0) || b.iter().all(|x| *x == 0.0) {
            return 0.0;
        }
        let cos = Self::cosine_similarity(a, b);
        // |a - b|^2 = 2 - 2cos for unit vectors
        let squared_distance = (2.0 - 2.0 * cos).max(0.0);
        (1.0 - squared_distance / std::f32::consts::SQRT_2).clamp(0.0, 1.0)
    }

    /// Top `top_k` chunks by descending relevance; ties keep input order.
    pub fn find_relevant_chunks(
        query_embedding: &[f32],
        embeddings: Vec<Embedding>,
        top_k: usize,
    ) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = embeddings
            .into_par_iter()
            .map(|emb| ScoredChunk {
                score: Self::relevance(query_embedding, &emb.vector),
                chunk: RetrievedChunk {
                    text: emb.text,
                    metadata: emb.metadata,
                },
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }
}
