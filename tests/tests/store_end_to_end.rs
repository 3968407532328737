use application::ingest_service::IngestService;
use application::rag_service::RagService;
use domain::models::QueryOutcome;
use domain::prompt::PromptTemplate;
use infrastructure::embedder::Embedder;
use infrastructure::embedding_storage::EmbeddingStorage;
use infrastructure::file_scanner::FileScanner;
use infrastructure::vector_store::VectorIndex;
use std::sync::Arc;
use tempfile::tempdir;
use tests::{KeywordEmbedder, StubCompletion};

#[tokio::test]
async fn ingested_documents_answer_matching_queries() {
    let data = tempdir().unwrap();
    let store = tempdir().unwrap();
    std::fs::create_dir_all(data.path().join("books")).unwrap();
    let france = data.path().join("books").join("france.md");
    std::fs::write(&france, "Paris is the capital of France.").unwrap();
    std::fs::write(
        data.path().join("books").join("spain.md"),
        "Madrid is the capital of Spain.",
    )
    .unwrap();

    let storage = Arc::new(EmbeddingStorage::new(store.path().join("embeddings.db")).unwrap());
    let ingest = IngestService::new(
        FileScanner::new(data.path(), 300, 100),
        Arc::clone(&storage),
        Embedder::new(Arc::new(KeywordEmbedder)),
    );
    let report = ingest.build_index().await.unwrap();
    assert_eq!(report.chunks_indexed, 2);

    let index = VectorIndex::new(Arc::clone(&storage), Arc::new(KeywordEmbedder));
    let completion = Arc::new(StubCompletion::replying("Paris."));
    let rag = RagService::new(Arc::new(index), completion.clone(), PromptTemplate::default());

    let QueryOutcome::Answered(result) = rag.query("What is the capital of France?").await.unwrap()
    else {
        panic!("expected an answer");
    };
    assert!(result
        .prompt
        .starts_with("Answer the question based only on the following context:\n\nParis is the capital of France."));
    assert_eq!(result.sources.len(), 2);
    assert_eq!(
        result.sources[0].as_deref(),
        Some(france.to_string_lossy().as_ref())
    );

    let unrelated = rag.query("How do volcanoes form?").await.unwrap();
    assert_eq!(unrelated, QueryOutcome::NoMatch);
    assert_eq!(completion.call_count(), 1);
}

#[tokio::test]
async fn closed_store_fails_queries() {
    let store = tempdir().unwrap();
    let storage = Arc::new(EmbeddingStorage::new(store.path().join("embeddings.db")).unwrap());
    let index = VectorIndex::new(Arc::clone(&storage), Arc::new(KeywordEmbedder));
    let rag = RagService::new(
        Arc::new(index),
        Arc::new(StubCompletion::replying("unused")),
        PromptTemplate::default(),
    );

    storage.close().unwrap();
    let err = rag.query("France").await.unwrap_err();
    assert_eq!(err.kind(), "vector_store");
}
