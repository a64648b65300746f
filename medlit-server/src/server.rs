//! Axum router, handlers, and server entry point.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use anyhow::Context;
use async_stream::stream;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::Stream;
use medlit_rag::{PipelineError, PipelineEvent, QaRequest, QueryPipeline, SearchRequest};
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::wire::{self, ErrorBody, QaBody, SearchBody, TranslateBody};

/// Capacity of the per-request event channel. Capacity 1 means the
/// pipeline hands each event to the transport before starting the next
/// stage; nothing is batched.
const EVENT_CHANNEL_CAPACITY: usize = 1;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The query pipeline, built once at startup.
    pub pipeline: Arc<QueryPipeline>,
    /// Embedding model name reported by the stats endpoint.
    pub embedding_model: String,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

/// Listen address configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 5000 }
    }
}

/// An error response: status code plus `{error}` body.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::Provider(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Consistency(_) => {
                error!(error = %err, "corpus consistency fault");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: err.user_message() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Build the application router.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/search", post(search))
        .route("/api/search_with_progress", post(search_with_progress))
        .route("/api/rag_qa", post(rag_qa))
        .route("/api/rag_qa_with_progress", post(rag_qa_with_progress))
        .route("/api/translate", post(translate))
        .route("/api/stats", get(stats))
        .route("/api/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind and serve until shutdown.
pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for medlit-server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("medlit-server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// ── handlers ───────────────────────────────────────────────────────

async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, top_k = ?body.top_k, "search request");

    let request = SearchRequest { query: body.query, top_k: body.top_k };
    let outcome = state.pipeline.search(&request).await?;
    Ok(Json(wire::search_response(&outcome)))
}

async fn search_with_progress(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, top_k = ?body.top_k, "streaming search request");

    let request = SearchRequest { query: body.query, top_k: body.top_k };
    // Validation failures stay synchronous: no stream is opened and no
    // progress events are emitted.
    state.pipeline.validate_search(&request)?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move { pipeline.search_streaming(request, tx).await });

    Ok(event_stream(rx))
}

async fn rag_qa(
    State(state): State<AppState>,
    Json(body): Json<QaBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, top_k = ?body.top_k, "RAG request");

    let request = QaRequest { question: body.question, top_k: body.top_k };
    let outcome = state.pipeline.answer(&request).await?;
    Ok(Json(wire::rag_response(&outcome)))
}

async fn rag_qa_with_progress(
    State(state): State<AppState>,
    Json(body): Json<QaBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, top_k = ?body.top_k, "streaming RAG request");

    let request = QaRequest { question: body.question, top_k: body.top_k };
    state.pipeline.validate_qa(&request)?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move { pipeline.answer_streaming(request, tx).await });

    Ok(event_stream(rx))
}

/// Forward pipeline events as SSE `data:` lines until the terminal one.
///
/// Dropping the returned stream (client disconnect) drops the receiver,
/// which aborts the pipeline at its next emission point.
fn event_stream(
    mut rx: mpsc::Receiver<PipelineEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            yield Ok(Event::default().data(wire::event_json(&event)));
            if terminal {
                break;
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn translate(
    State(state): State<AppState>,
    Json(body): Json<TranslateBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.query.trim().is_empty() {
        return Err(ApiError::from(PipelineError::InvalidInput("Query is required".into())));
    }

    let outcome = state.pipeline.translate_direct(&body.query).await?;
    Ok(Json(json!({
        "original": outcome.original,
        "translated": outcome.translated,
        "is_pure_english": !outcome.was_translated,
    })))
}

async fn stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "total_articles": state.pipeline.article_count(),
        "index_size": state.pipeline.index_size(),
        "model_name": state.embedding_model,
        "translation_support": true,
        "rag_support": true,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "message": "medlit search API with translation and RAG is running",
    }))
}
