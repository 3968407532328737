use crate::http::{self, AppState};
use application::ingest_service::IngestService;
use application::rag_service::RagService;
use clap::{ArgAction, Parser};
use domain::prompt::PromptTemplate;
use infrastructure::{
    config::Config, embedder::Embedder, embedding_storage::EmbeddingStorage,
    file_scanner::FileScanner, providers::Providers, vector_store::VectorIndex,
};
use shared::telemetry::{init_logging, LogConfig};
use shared::types::{AppError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Retrieval-augmented question answering over a local document store.
#[derive(Parser, Debug)]
#[command(name = "rag_server")]
#[command(about = "Serve GET /generate answers grounded in a persistent vector store", long_about = None)]
pub struct Cli {
    /// Directory the vector index persists to (overrides CHROMA_DIR)
    #[arg(long)]
    pub persist_dir: Option<PathBuf>,

    /// Directory of .md/.txt documents ingested at startup (overrides DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Listen address (overrides BIND_ADDR)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Serve the existing store without scanning documents
    #[arg(long, action = ArgAction::SetTrue)]
    pub skip_ingest: bool,

    /// Index documents and exit without serving
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "skip_ingest")]
    pub ingest_only: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the environment config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.persist_dir {
            config.persist_dir = dir.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(addr) = self.bind {
            config.bind_addr = addr;
        }
    }
}

pub struct ServerApp {
    config: Config,
    skip_ingest: bool,
    ingest_only: bool,
}

impl ServerApp {
    /// Loads and validates configuration, then installs logging.
    pub fn init(cli: &Cli) -> Result<Self> {
        let mut config = Config::load()?;
        cli.apply(&mut config);
        config.validate()?;

        init_logging(
            &LogConfig::new("rag_server")
                .with_log_level(config.log_level.clone())
                .with_json_logs(config.json_logs),
        );

        Ok(Self {
            config,
            skip_ingest: cli.skip_ingest,
            ingest_only: cli.ingest_only,
        })
    }

    /// Opens the store, ingests, serves until a shutdown signal, then tears down.
    pub async fn run(self) -> Result<()> {
        let providers = Providers::from_config(&self.config)?;
        let template = load_template(&self.config)?;
        let storage = Arc::new(EmbeddingStorage::new(self.config.db_path())?);

        let outcome = self.run_with(&storage, providers, template).await;
        let teardown = self.teardown(&storage);
        outcome.and(teardown)
    }

    async fn run_with(
        &self,
        storage: &Arc<EmbeddingStorage>,
        providers: Providers,
        template: PromptTemplate,
    ) -> Result<()> {
        if !self.skip_ingest {
            let ingest = IngestService::new(
                FileScanner::new(
                    &self.config.data_dir,
                    self.config.chunk_size,
                    self.config.chunk_overlap,
                ),
                Arc::clone(storage),
                Embedder::new(Arc::clone(&providers.embedding)),
            );
            ingest.build_index().await?;
        }
        if self.ingest_only {
            return Ok(());
        }

        tracing::info!(chunks = storage.count()?, "Vector store ready");
        let index = VectorIndex::new(Arc::clone(storage), Arc::clone(&providers.embedding));
        let rag = RagService::new(Arc::new(index), providers.completion, template);
        let state = Arc::new(AppState::new(Arc::new(rag)));

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        http::serve(listener, state, shutdown_signal()).await
    }

    fn teardown(&self, storage: &EmbeddingStorage) -> Result<()> {
        storage.close()?;
        if self.config.purge_on_shutdown && self.config.persist_dir.exists() {
            std::fs::remove_dir_all(&self.config.persist_dir)?;
            tracing::info!(dir = %self.config.persist_dir.display(), "Vector store purged");
        }
        Ok(())
    }
}

pub fn load_template(config: &Config) -> Result<PromptTemplate> {
    match &config.prompt_template_path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                AppError::config(format!("cannot read prompt template {}: {e}", path.display()))
            })?;
            PromptTemplate::parse(&text)
        }
        None => Ok(PromptTemplate::default()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
