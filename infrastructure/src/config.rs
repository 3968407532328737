use dotenvy::dotenv;
use shared::types::{AppError, Result};
use shared::utils::parse_flag;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Ollama,
}

impl Provider {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(AppError::config(format!(
                "unknown LLM_PROVIDER '{other}' (expected 'openai' or 'ollama')"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the vector index persists to (`CHROMA_DIR`).
    pub persist_dir: PathBuf,
    /// Documents ingested at startup.
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_chat_model: String,
    pub openai_embedding_model: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_embedding_model: String,
    pub prompt_template_path: Option<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub log_level: String,
    pub json_logs: bool,
    pub purge_on_shutdown: bool,
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; `load` passes the environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bind_addr = get("BIND_ADDR", "127.0.0.1:8000")
            .parse::<SocketAddr>()
            .map_err(|e| AppError::config(format!("invalid BIND_ADDR: {e}")))?;

        let provider = Provider::parse(&get("LLM_PROVIDER", "openai"))?;

        let chunk_size = parse_usize("CHUNK_SIZE", &get("CHUNK_SIZE", "300"))?;
        let chunk_overlap = parse_usize("CHUNK_OVERLAP", &get("CHUNK_OVERLAP", "100"))?;
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(AppError::config(
                "CHUNK_SIZE must be positive and larger than CHUNK_OVERLAP",
            ));
        }

        Ok(Self {
            persist_dir: PathBuf::from(get("CHROMA_DIR", "chroma")),
            data_dir: PathBuf::from(get("DATA_DIR", "data")),
            bind_addr,
            provider,
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            openai_base_url: get("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_chat_model: get("OPENAI_CHAT_MODEL", "gpt-3.5-turbo"),
            openai_embedding_model: get("OPENAI_EMBEDDING_MODEL", "text-embedding-ada-002"),
            ollama_base_url: get("OLLAMA_BASE_URL", "http://localhost:11434"),
            ollama_model: get("OLLAMA_MODEL", "qwen2.5:1.5b-instruct"),
            ollama_embedding_model: get("OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
            prompt_template_path: lookup("PROMPT_TEMPLATE_PATH").map(PathBuf::from),
            chunk_size,
            chunk_overlap,
            log_level: get("LOG_LEVEL", "info"),
            json_logs: lookup("LOG_JSON").is_some_and(|v| parse_flag(&v)),
            purge_on_shutdown: lookup("PURGE_ON_SHUTDOWN").is_some_and(|v| parse_flag(&v)),
        })
    }

    /// Path of the SQLite file inside the persist directory.
    pub fn db_path(&self) -> PathBuf {
        self.persist_dir.join("embeddings.db")
    }

    /// Fails when the selected provider lacks credentials.
    pub fn validate(&self) -> Result<()> {
        if self.provider == Provider::OpenAi && self.openai_api_key.is_none() {
            return Err(AppError::config(
                "OPENAI_API_KEY must be set when LLM_PROVIDER=openai",
            ));
        }
        if self.persist_dir.as_os_str().is_empty() {
            return Err(AppError::config("CHROMA_DIR must not be empty"));
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| AppError::config(format!("invalid {key}: {e}")))
}
