//! Error and result types shared by every layer of the service.

use thiserror::Error;

/// Result type alias using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified error type for the RAG service.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration (credentials, directories, bind address).
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The prompt template text could not be parsed.
    #[error("Invalid prompt template: {message}")]
    Template {
        /// Description of the template error.
        message: String,
    },

    /// Failure inside the persistent vector store.
    #[error("Vector store error: {message}")]
    VectorStore {
        /// Error message.
        message: String,
    },

    /// The embedding provider failed or returned an unusable payload.
    #[error("Embedding provider error: {message}")]
    Embedding {
        /// Error message.
        message: String,
    },

    /// The completion provider failed or returned an unusable payload.
    #[error("Completion provider error: {message}")]
    Completion {
        /// Error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Returns `true` if the error originated at a hosted model provider.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Embedding { .. } | Self::Completion { .. })
    }

    /// Short machine-readable name of the error kind, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Template { .. } => "template",
            Self::VectorStore { .. } => "vector_store",
            Self::Embedding { .. } => "embedding",
            Self::Completion { .. } => "completion",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Creates a vector store error from anything displayable.
    #[must_use]
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::VectorStore {
            message: err.to_string(),
        }
    }

    /// Creates an embedding provider error from anything displayable.
    #[must_use]
    pub fn embedding(err: impl std::fmt::Display) -> Self {
        Self::Embedding {
            message: err.to_string(),
        }
    }

    /// Creates a completion provider error from anything displayable.
    #[must_use]
    pub fn completion(err: impl std::fmt::Display) -> Self {
        Self::Completion {
            message: err.to_string(),
        }
    }
}
