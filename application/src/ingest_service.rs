use domain::models::SOURCE_KEY;
use infrastructure::{
    embedder::{Embedder, EmbeddingInput},
    embedding_storage::EmbeddingStorage,
    file_scanner::FileScanner,
};
use shared::telemetry::Telemetry;
use shared::types::{AppError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Counters reported after an ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files_seen: usize,
    pub files_indexed: usize,
    pub files_unchanged: usize,
    pub files_removed: usize,
    pub chunks_indexed: usize,
}

/// Work left for the embedding step once the store has been reconciled with disk.
struct IndexPlan {
    inputs: Vec<EmbeddingInput>,
    pending_hashes: Vec<(String, String)>,
    report: IngestReport,
}

/// Loads documents from disk into the vector store.
pub struct IngestService {
    scanner: Arc<FileScanner>,
    storage: Arc<EmbeddingStorage>,
    embedder: Embedder,
}

impl IngestService {
    pub fn new(scanner: FileScanner, storage: Arc<EmbeddingStorage>, embedder: Embedder) -> Self {
        Self {
            scanner: Arc::new(scanner),
            storage,
            embedder,
        }
    }

    /// Indexes new or changed files and drops sources that are gone from disk.
    /// A missing document directory is not an error and leaves the store as is.
    pub async fn build_index(&self) -> Result<IngestReport> {
        let timer = Telemetry::new();
        let scanner = Arc::clone(&self.scanner);
        let storage = Arc::clone(&self.storage);
        let Some(plan) = blocking(move || plan_index(&scanner, &storage)).await? else {
            return Ok(IngestReport::default());
        };
        let IndexPlan {
            inputs,
            pending_hashes,
            mut report,
        } = plan;

        let embeddings = if inputs.is_empty() {
            Vec::new()
        } else {
            self.embedder.generate_embeddings(&inputs).await?
        };
        report.chunks_indexed = embeddings.len();

        let storage = Arc::clone(&self.storage);
        blocking(move || {
            for (source, _) in &pending_hashes {
                storage.delete_embeddings_for_source(source)?;
            }
            if !embeddings.is_empty() {
                storage.insert_embeddings(&embeddings)?;
            }
            // Hashes are recorded only after the chunks are stored, so a failed
            // run re-indexes the file next time.
            for (source, hash) in &pending_hashes {
                storage.upsert_file_hash(source, hash)?;
            }
            Ok(())
        })
        .await?;

        tracing::info!(
            files_indexed = report.files_indexed,
            files_unchanged = report.files_unchanged,
            files_removed = report.files_removed,
            chunks = report.chunks_indexed,
            elapsed_ms = timer.elapsed_ms(),
            "Indexing complete"
        );
        Ok(report)
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(AppError::store)?
}

/// Scans the document directory, removes stale sources and collects the
/// chunks of new or changed files. `None` when the directory is missing.
fn plan_index(scanner: &FileScanner, storage: &EmbeddingStorage) -> Result<Option<IndexPlan>> {
    let root = scanner.root_path();
    if !root.is_dir() {
        tracing::warn!(data_dir = %root.display(), "Document directory not found; skipping ingestion");
        return Ok(None);
    }

    let scans = scanner.scan_files()?;
    tracing::info!(data_dir = %root.display(), files = scans.len(), "Scanning documents");
    let mut report = IngestReport {
        files_seen: scans.len(),
        ..IngestReport::default()
    };

    let live: HashSet<&str> = scans
        .iter()
        .filter(|scan| !scan.hash.is_empty() && !scan.chunks.is_empty())
        .map(|scan| scan.source.as_str())
        .collect();
    for source in storage.indexed_sources()? {
        if !live.contains(source.as_str()) {
            let chunks = storage.remove_source(&source)?;
            tracing::info!(source = %source, chunks, "Removed document no longer on disk");
            report.files_removed += 1;
        }
    }

    let mut inputs: Vec<EmbeddingInput> = Vec::new();
    let mut pending_hashes: Vec<(String, String)> = Vec::new();

    for scan in scans {
        if scan.hash.is_empty() || scan.chunks.is_empty() {
            continue;
        }

        let previous_hash = storage.get_file_hash(&scan.source)?;
        if previous_hash.as_deref() == Some(scan.hash.as_str()) {
            report.files_unchanged += 1;
            continue;
        }

        tracing::debug!(source = %scan.source, chunks = scan.chunks.len(), "Processing document");
        for chunk in scan.chunks {
            let mut metadata = HashMap::new();
            metadata.insert(
                SOURCE_KEY.to_string(),
                serde_json::Value::String(chunk.source.clone()),
            );
            metadata.insert("start_index".to_string(), serde_json::json!(chunk.start_offset));
            inputs.push(EmbeddingInput {
                id: format!("{}:{}", chunk.source, chunk.start_offset),
                text: chunk.text,
                metadata,
            });
        }

        report.files_indexed += 1;
        pending_hashes.push((scan.source, scan.hash));
    }

    Ok(Some(IndexPlan {
        inputs,
        pending_hashes,
        report,
    }))
}
