//! Test doubles for the pipeline's capability traits.

use async_trait::async_trait;
use domain::models::{RetrievedChunk, ScoredChunk};
use domain::ports::{CompletionProvider, EmbeddingProvider, VectorSearch};
use parking_lot::Mutex;
use shared::types::{AppError, Result};

/// Returns a fixed ranking and records every `(query, k)` it is asked for.
pub struct StubSearch {
    results: Vec<ScoredChunk>,
    fail: bool,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl StubSearch {
    pub fn new(results: Vec<ScoredChunk>) -> Self {
        Self {
            results,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorSearch for StubSearch {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        self.calls.lock().push((query.to_string(), k));
        if self.fail {
            return Err(AppError::embedding("embedding endpoint unreachable"));
        }
        Ok(self.results.iter().take(k).cloned().collect())
    }
}

/// Replies with a canned answer and records the prompts it receives.
pub struct StubCompletion {
    reply: std::result::Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubCompletion {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl CompletionProvider for StubCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.reply.clone().map_err(AppError::completion)
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// Maps text onto a few fixed directions by keyword, for end-to-end store tests.
pub struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(if lower.contains("france") || lower.contains("paris") {
            vec![1.0, 0.0, 0.0]
        } else if lower.contains("spain") || lower.contains("madrid") {
            vec![0.0, 1.0, 0.0]
        } else {
            vec![0.0, 0.0, 1.0]
        })
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

pub fn chunk(text: &str, source: Option<&str>, score: f32) -> ScoredChunk {
    let chunk = match source {
        Some(source) => RetrievedChunk::new(text).with_source(source),
        None => RetrievedChunk::new(text),
    };
    ScoredChunk { chunk, score }
}
