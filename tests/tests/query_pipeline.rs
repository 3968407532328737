use application::rag_service::RagService;
use domain::models::{QueryOutcome, TOP_K};
use domain::prompt::{PromptInputs, PromptTemplate};
use std::sync::Arc;
use tests::{chunk, StubCompletion, StubSearch};

fn service(search: Arc<StubSearch>, completion: Arc<StubCompletion>) -> RagService {
    RagService::new(search, completion, PromptTemplate::default())
}

#[tokio::test]
async fn empty_results_return_no_match_without_completion() {
    let search = Arc::new(StubSearch::new(Vec::new()));
    let completion = Arc::new(StubCompletion::replying("unused"));
    let rag = service(Arc::clone(&search), Arc::clone(&completion));

    let outcome = rag.query("anything").await.unwrap();

    assert_eq!(outcome, QueryOutcome::NoMatch);
    assert_eq!(completion.call_count(), 0);
    assert_eq!(search.calls.lock().as_slice(), &[("anything".to_string(), TOP_K)]);
}

#[tokio::test]
async fn low_top_score_returns_no_match_regardless_of_others() {
    let search = Arc::new(StubSearch::new(vec![
        chunk("T1", Some("a.md"), 0.5),
        chunk("T2", Some("b.md"), 0.99),
        chunk("T3", Some("c.md"), 0.98),
    ]));
    let completion = Arc::new(StubCompletion::replying("unused"));
    let rag = service(search, Arc::clone(&completion));

    let outcome = rag.query("What is the capital of France?").await.unwrap();

    assert!(outcome.is_no_match());
    assert_eq!(completion.call_count(), 0);
}

#[tokio::test]
async fn threshold_is_inclusive() {
    let search = Arc::new(StubSearch::new(vec![chunk("T1", None, 0.7)]));
    let completion = Arc::new(StubCompletion::replying("ok"));
    let rag = service(search, Arc::clone(&completion));

    assert!(!rag.query("q").await.unwrap().is_no_match());
    assert_eq!(completion.call_count(), 1);
}

#[tokio::test]
async fn capital_of_france_end_to_end() {
    let search = Arc::new(StubSearch::new(vec![
        chunk("T1", Some("data/books/france.md"), 0.82),
        chunk("T2", Some("data/books/europe.md"), 0.75),
        chunk("T3", None, 0.71),
    ]));
    let completion = Arc::new(StubCompletion::replying("Paris."));
    let rag = service(search, Arc::clone(&completion));
    let question = "What is the capital of France?";

    let QueryOutcome::Answered(result) = rag.query(question).await.unwrap() else {
        panic!("expected an answer");
    };

    let expected_prompt = PromptTemplate::default().render(&PromptInputs {
        context: "T1\n\n---\n\nT2\n\n---\n\nT3",
        question,
    });
    assert_eq!(result.query, question);
    assert_eq!(result.prompt, expected_prompt);
    assert_eq!(completion.prompts.lock().as_slice(), &[expected_prompt]);
    assert_eq!(result.answer, "Paris.");
    assert_eq!(
        result.sources,
        vec![
            Some("data/books/france.md".to_string()),
            Some("data/books/europe.md".to_string()),
            None,
        ]
    );

    let formatted = result.formatted_response();
    assert!(formatted.contains("Response: Paris."));
    assert!(formatted.ends_with("Sources: [data/books/france.md, data/books/europe.md, none]"));
}

#[tokio::test]
async fn fewer_than_k_chunks_are_all_used() {
    let search = Arc::new(StubSearch::new(vec![
        chunk("only one", Some("one.md"), 0.9),
        chunk("and two", None, 0.2),
    ]));
    let completion = Arc::new(StubCompletion::replying("fine"));
    let rag = service(search, Arc::clone(&completion));

    let QueryOutcome::Answered(result) = rag.query("q").await.unwrap() else {
        panic!("expected an answer");
    };
    assert!(result.prompt.contains("only one\n\n---\n\nand two"));
    assert_eq!(result.sources.len(), 2);
}

#[tokio::test]
async fn identical_requests_render_identical_prompts() {
    let search = Arc::new(StubSearch::new(vec![chunk("ctx", None, 0.95)]));
    let completion = Arc::new(StubCompletion::replying("same"));
    let rag = service(search, Arc::clone(&completion));

    let first = rag.query("repeat?").await.unwrap();
    let second = rag.query("repeat?").await.unwrap();

    assert_eq!(first, second);
    let prompts = completion.prompts.lock();
    assert_eq!(prompts[0], prompts[1]);
}

#[tokio::test]
async fn search_failure_propagates() {
    let search = Arc::new(StubSearch::failing());
    let completion = Arc::new(StubCompletion::replying("unused"));
    let rag = service(search, Arc::clone(&completion));

    let err = rag.query("q").await.unwrap_err();
    assert!(err.is_upstream());
    assert_eq!(completion.call_count(), 0);
}

#[tokio::test]
async fn completion_failure_propagates_without_retry() {
    let search = Arc::new(StubSearch::new(vec![chunk("ctx", None, 0.95)]));
    let completion = Arc::new(StubCompletion::failing("429 quota exceeded"));
    let rag = service(search, Arc::clone(&completion));

    let err = rag.query("q").await.unwrap_err();
    assert_eq!(err.kind(), "completion");
    assert_eq!(completion.call_count(), 1);
}
