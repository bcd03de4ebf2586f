//! HTTP API server.
//!
//! Exposes the pipeline as a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Status, version and index size |
//! | `POST` | `/ingest` | Replace the indexed document |
//! | `POST` | `/answer` | Answer a question from the document |
//! | `POST` | `/search` | Retrieval only, no generation |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_indexed", "message": "no document has been ingested" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_indexed` (409), `timeout` (504),
//! `generation_failed` (502), `ingestion_failed` (400 for bad input, 502
//! for provider failures).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ragdoc_core::error::{AnswerError, EmbeddingError, GenerationError, IngestionError};
use ragdoc_core::models::{Document, RetrievedContext};
use ragdoc_core::pipeline::{AnswerKind, Pipeline, PipelineState};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Build the router over a shared pipeline.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/ingest", post(handle_ingest))
        .route("/answer", post(handle_answer))
        .route("/search", post(handle_search))
        .layer(cors)
        .with_state(AppState { pipeline })
}

/// Bind to `bind` and serve until the process is terminated.
pub async fn run_server(bind: &str, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %bind, "HTTP server listening");
    println!("ragdoc server listening on http://{}", bind);
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

impl From<AnswerError> for AppError {
    fn from(e: AnswerError) -> Self {
        let message = e.to_string();
        match e {
            AnswerError::NotIndexed => AppError::new(StatusCode::CONFLICT, "not_indexed", message),
            AnswerError::EmptyQuery => bad_request(message),
            AnswerError::Generation(GenerationError::Timeout(_)) => {
                AppError::new(StatusCode::GATEWAY_TIMEOUT, "timeout", message)
            }
            AnswerError::Generation(_) => {
                AppError::new(StatusCode::BAD_GATEWAY, "generation_failed", message)
            }
        }
    }
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        let message = e.to_string();
        match e {
            IngestionError::Embedding(EmbeddingError::Timeout(_)) => {
                AppError::new(StatusCode::GATEWAY_TIMEOUT, "timeout", message)
            }
            IngestionError::Chunking(_) | IngestionError::Embedding(EmbeddingError::Disabled) => {
                AppError::new(StatusCode::BAD_REQUEST, "ingestion_failed", message)
            }
            _ => AppError::new(StatusCode::BAD_GATEWAY, "ingestion_failed", message),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    indexed: bool,
    chunks: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        indexed: state.pipeline.state() == PipelineState::Indexed,
        chunks: state.pipeline.chunk_count(),
    })
}

// ============ POST /ingest ============

#[derive(Deserialize)]
struct IngestRequest {
    id: Option<String>,
    text: String,
}

#[derive(Serialize)]
struct IngestResponse {
    document_id: String,
    chunks: usize,
    dims: Option<usize>,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    let id = req.id.unwrap_or_else(|| "document".to_string());
    if id.trim().is_empty() {
        return Err(bad_request("id must not be empty"));
    }
    let report = state.pipeline.ingest(Document::new(id, req.text)).await?;
    Ok(Json(IngestResponse {
        document_id: report.document_id,
        chunks: report.chunks,
        dims: report.dims,
    }))
}

// ============ POST /answer ============

#[derive(Deserialize)]
struct AnswerRequest {
    query: String,
}

#[derive(Serialize)]
struct ContextItem {
    chunk_id: usize,
    score: f32,
    text: String,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
    kind: AnswerKind,
    context: Vec<ContextItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    degraded: Option<String>,
}

fn context_items(ctx: &RetrievedContext) -> Vec<ContextItem> {
    ctx.hits
        .iter()
        .map(|h| ContextItem {
            chunk_id: h.chunk.id,
            score: h.score,
            text: h.chunk.text.clone(),
        })
        .collect()
}

async fn handle_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let answer = state.pipeline.answer(&req.query).await?;
    Ok(Json(AnswerResponse {
        context: context_items(&answer.context),
        degraded: answer.context.degradation.as_ref().map(|d| d.to_string()),
        answer: answer.text,
        kind: answer.kind,
    }))
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<ContextItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    degraded: Option<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.k == Some(0) {
        return Err(bad_request("k must be >= 1"));
    }
    let ctx = state.pipeline.retrieve(&req.query, req.k).await?;
    Ok(Json(SearchResponse {
        results: context_items(&ctx),
        degraded: ctx.degradation.as_ref().map(|d| d.to_string()),
    }))
}
