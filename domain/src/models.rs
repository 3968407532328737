use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Number of chunks retrieved per query.
pub const TOP_K: usize = 3;

/// Minimum relevance the best match must reach before generation runs.
pub const RELEVANCE_THRESHOLD: f32 = 0.7;

/// Separator placed between retrieved chunks in the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Returned instead of an answer when nothing relevant was found.
pub const NO_MATCH_MESSAGE: &str = "Unable to find matching results.";

/// Metadata key carrying the chunk's origin.
pub const SOURCE_KEY: &str = "source";

/// A stored chunk as persisted by the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RetrievedChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.insert(
            SOURCE_KEY.to_string(),
            serde_json::Value::String(source.into()),
        );
        self
    }

    /// The `source` metadata entry. Non-string values are rendered as JSON.
    pub fn source(&self) -> Option<String> {
        match self.metadata.get(SOURCE_KEY)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// A chunk paired with its relevance (higher = more similar).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: RetrievedChunk,
    pub score: f32,
}

/// Successful pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub query: String,
    pub prompt: String,
    pub answer: String,
    pub sources: Vec<Option<String>>,
}

impl GenerationResult {
    /// `Response: <answer>\nSources: [<s1>, <s2>, ...]`, missing sources shown as `none`.
    pub fn formatted_response(&self) -> String {
        format!("Response: {}\nSources: {}", self.answer, SourceList(&self.sources))
    }
}

struct SourceList<'a>(&'a [Option<String>]);

impl fmt::Display for SourceList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, source) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match source {
                Some(s) => f.write_str(s)?,
                None => f.write_str("none")?,
            }
        }
        f.write_str("]")
    }
}

/// What the query handler hands back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    NoMatch,
    Answered(GenerationResult),
}

impl QueryOutcome {
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_lookup() {
        let chunk = RetrievedChunk::new("text").with_source("data/books/alice.md");
        assert_eq!(chunk.source().as_deref(), Some("data/books/alice.md"));

        let bare = RetrievedChunk::new("text");
        assert_eq!(bare.source(), None);

        let mut numeric = RetrievedChunk::new("text");
        numeric
            .metadata
            .insert(SOURCE_KEY.to_string(), serde_json::json!(42));
        assert_eq!(numeric.source().as_deref(), Some("42"));
    }

    #[test]
    fn test_formatted_response_marks_missing_sources() {
        let result = GenerationResult {
            query: "q".to_string(),
            prompt: "p".to_string(),
            answer: "Paris.".to_string(),
            sources: vec![Some("a.md".to_string()), None, Some("b.md".to_string())],
        };
        assert_eq!(
            result.formatted_response(),
            "Response: Paris.\nSources: [a.md, none, b.md]"
        );
    }

    #[test]
    fn test_formatted_response_empty_sources() {
        let result = GenerationResult {
            query: String::new(),
            prompt: String::new(),
            answer: "ok".to_string(),
            sources: Vec::new(),
        };
        assert_eq!(result.formatted_response(), "Response: ok\nSources: []");
    }
}
