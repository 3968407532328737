use domain::models::{
    GenerationResult, QueryOutcome, ScoredChunk, CONTEXT_SEPARATOR, NO_MATCH_MESSAGE,
    RELEVANCE_THRESHOLD, TOP_K,
};
use domain::ports::{CompletionProvider, VectorSearch};
use domain::prompt::{PromptInputs, PromptTemplate};
use shared::telemetry::Telemetry;
use shared::types::Result;
use std::sync::Arc;

/// Retrieval, threshold, prompt rendering and completion for one query.
pub struct RagService {
    search: Arc<dyn VectorSearch>,
    completion: Arc<dyn CompletionProvider>,
    template: PromptTemplate,
}

impl RagService {
    pub fn new(
        search: Arc<dyn VectorSearch>,
        completion: Arc<dyn CompletionProvider>,
        template: PromptTemplate,
    ) -> Self {
        Self {
            search,
            completion,
            template,
        }
    }

    /// Answers `question`, or returns [`QueryOutcome::NoMatch`] when the best
    /// match scores below the relevance threshold. Provider failures are
    /// returned as-is; nothing is retried.
    pub async fn query(&self, question: &str) -> Result<QueryOutcome> {
        let timer = Telemetry::new();
        tracing::info!(query = %question, "Query received");

        let results = self.search.search(question, TOP_K).await?;
        if !passes_threshold(&results) {
            tracing::error!(
                query = %question,
                top_score = ?results.first().map(|r| r.score),
                "{}",
                NO_MATCH_MESSAGE
            );
            return Ok(QueryOutcome::NoMatch);
        }

        let context = build_context(&results);
        tracing::info!(chunks = results.len(), context = %context, "Context assembled");

        let prompt = self.template.render(&PromptInputs {
            context: &context,
            question,
        });
        tracing::info!(prompt = %prompt, "Prompt rendered");

        let answer = self.completion.complete(&prompt).await?;

        let result = GenerationResult {
            query: question.to_string(),
            prompt,
            answer,
            sources: results.iter().map(|r| r.chunk.source()).collect(),
        };
        tracing::info!(
            response = %result.formatted_response(),
            model = self.completion.model_name(),
            elapsed_ms = timer.elapsed_ms(),
            "Response produced"
        );
        Ok(QueryOutcome::Answered(result))
    }
}

/// The best match must exist and reach the threshold; the rest are not checked.
pub fn passes_threshold(results: &[ScoredChunk]) -> bool {
    results
        .first()
        .is_some_and(|top| top.score >= RELEVANCE_THRESHOLD)
}

pub fn build_context(results: &[ScoredChunk]) -> String {
    results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
