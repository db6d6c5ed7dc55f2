//! HTTP front end for the answering pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/answer` | `{query, chat_history}` → Answer Record |
//!
//! The server is stateless: chat history is sent by the client with every
//! request.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400) for invalid input, `upstream_error` (502)
//! when an embedding, index or model call fails.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser chat page
//! can call the API directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::models::{AnswerRecord, ConversationTurn};
use crate::pipeline::AnsweringPipeline;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<AnsweringPipeline>,
}

/// Build the router. Exposed separately from [`run_server`] for tests.
pub fn router(pipeline: Arc<AnsweringPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/answer", post(handle_answer))
        .layer(cors)
        .with_state(AppState { pipeline })
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: &Config, pipeline: Arc<AnsweringPipeline>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(pipeline);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, index = %config.index.name, "server listening");
    println!("dochelp listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
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
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn upstream_error(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream_error",
        message: format!("{:#}", err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /answer ============

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    query: String,
    #[serde(default)]
    chat_history: Vec<ConversationTurn>,
}

async fn handle_answer(
    State(state): State<AppState>,
    body: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerRecord>, AppError> {
    let Json(req) = body.map_err(|e| bad_request(e.body_text()))?;

    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let record = state
        .pipeline
        .answer(&req.query, &req.chat_history)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "answer failed");
            upstream_error(e)
        })?;

    Ok(Json(record))
}
