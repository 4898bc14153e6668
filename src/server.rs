//! HTTP transport.
//!
//! - `POST /graphql`: execute a [`QueryRequest`]
//! - `GET /schema`: schema SDL
//! - `GET /health`: liveness

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

use crate::query::{QueryExecutor, QueryRequest};
use crate::schema::SCHEMA_SDL;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    executor: Arc<QueryExecutor>,
}

impl AppState {
    /// Wrap an executor.
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/graphql", post(execute))
        .route("/schema", get(schema))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve `router(state)` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    info!(%addr, "agenda listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed")
}

async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let body = json!({
                "data": null,
                "errors": [{
                    "message": rejection.body_text(),
                    "code": "INVALID_REQUEST",
                    "path": [],
                }],
            });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    let response = state.executor.execute(request).await;
    let status =
        StatusCode::from_u16(response.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response)).into_response()
}

async fn schema() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        SCHEMA_SDL,
    )
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
