use application::rag_service::RagService;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::prompt::PromptTemplate;
use http_body_util::BodyExt;
use presentation::http::{router, AppState};
use std::sync::Arc;
use tests::{chunk, StubCompletion, StubSearch};
use tower::ServiceExt;

fn app(search: StubSearch, completion: StubCompletion) -> axum::Router {
    let rag = RagService::new(
        Arc::new(search),
        Arc::new(completion),
        PromptTemplate::default(),
    );
    router(Arc::new(AppState::new(Arc::new(rag))))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

#[tokio::test]
async fn generate_returns_answer_array() {
    let app = app(
        StubSearch::new(vec![
            chunk("T1", Some("a.md"), 0.82),
            chunk("T2", Some("b.md"), 0.75),
            chunk("T3", None, 0.71),
        ]),
        StubCompletion::replying("Paris."),
    );

    let (status, body) = get(
        app,
        "/generate/?query_text=What%20is%20the%20capital%20of%20France%3F",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let parts = value.as_array().unwrap();
    assert_eq!(parts.len(), 5);
    assert_eq!(parts[0], "Query: What is the capital of France?");
    assert_eq!(parts[1], "");
    assert!(parts[2]
        .as_str()
        .unwrap()
        .contains("T1\n\n---\n\nT2\n\n---\n\nT3"));
    assert_eq!(parts[3], "");
    assert_eq!(parts[4], "Response: Paris.\nSources: [a.md, b.md, none]");
}

#[tokio::test]
async fn generate_without_trailing_slash() {
    let app = app(StubSearch::new(Vec::new()), StubCompletion::replying("unused"));
    let (status, body) = get(app, "/generate?query_text=hello").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
        serde_json::json!("Unable to find matching results.")
    );
}

#[tokio::test]
async fn low_score_returns_sentinel_string() {
    let app = app(
        StubSearch::new(vec![chunk("T1", None, 0.5)]),
        StubCompletion::replying("unused"),
    );
    let (status, body) = get(app, "/generate/?query_text=unrelated").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"\"Unable to find matching results.\"");
}

#[tokio::test]
async fn missing_query_parameter_is_rejected() {
    let app = app(StubSearch::new(Vec::new()), StubCompletion::replying("unused"));
    let (status, _) = get(app, "/generate/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn provider_failure_maps_to_bad_gateway() {
    let app = app(
        StubSearch::new(vec![chunk("T1", None, 0.9)]),
        StubCompletion::failing("401 invalid api key"),
    );
    let (status, body) = get(app, "/generate/?query_text=q").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, b"Bad Gateway");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = app(StubSearch::new(Vec::new()), StubCompletion::replying("unused"));
    let (status, _) = get(app, "/health").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
