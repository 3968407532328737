//! HTTP shell: a single `GET /generate` route over the query service.

use std::future::Future;
use std::sync::Arc;

use application::rag_service::RagService;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use domain::models::{QueryOutcome, NO_MATCH_MESSAGE};
use serde::{Deserialize, Serialize};
use shared::types::{AppError, Result};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Request-independent state handed to every handler.
pub struct AppState {
    pub rag: Arc<RagService>,
}

impl AppState {
    pub fn new(rag: Arc<RagService>) -> Self {
        Self { rag }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    pub query_text: String,
}

/// Body of a successful `/generate` call.
///
/// A miss is a bare JSON string; an answer is the five-element array
/// `["Query: <q>", "", <prompt>, "", <formatted response>]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerateResponse {
    Message(String),
    Answer([String; 5]),
}

impl From<QueryOutcome> for GenerateResponse {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::NoMatch => Self::Message(NO_MATCH_MESSAGE.to_string()),
            QueryOutcome::Answered(result) => {
                let formatted = result.formatted_response();
                Self::Answer([
                    format!("Query: {}", result.query),
                    String::new(),
                    result.prompt,
                    String::new(),
                    formatted,
                ])
            }
        }
    }
}

/// Maps pipeline failures onto status codes; the body carries no detail.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_upstream() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(kind = self.0.kind(), error = %self.0, status = status.as_u16(), "Request failed");
        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GenerateParams>,
) -> std::result::Result<Json<GenerateResponse>, ApiError> {
    let outcome = state.rag.query(&params.query_text).await?;
    Ok(Json(outcome.into()))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate", get(generate))
        .route("/generate/", get(generate))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("HTTP server stopped");
    Ok(())
}
