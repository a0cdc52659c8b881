//! HTTP surface served on the unix socket.
//!
//! OpenAI-compatible routes, mounted both under `/v1` and under
//! `/models/v1`, plus `/health`.

use crate::gateway::{
    Gateway,
    router::{Relay, Reply},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{Method, StatusCode, Uri},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use futures_util::StreamExt;
use mcore::{Adapter, ChatRequest, CompletionRequest, Error, StreamChunk, TextCompletion};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;

/// Build the router for `gateway`.
pub fn router<A: Adapter>(gateway: Gateway<A>) -> Router {
    let limit = gateway.limits.max_request_size;
    let api = Router::new()
        .route("/chat/completions", post(chat_completions::<A>))
        .route("/completions", post(completions::<A>))
        .route("/models", get(models::<A>))
        .method_not_allowed_fallback(method_not_allowed);

    Router::new()
        .nest("/v1", api.clone())
        .nest("/models/v1", api)
        .route("/health", get(health))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(limit))
        .with_state(gateway)
}

/// A gateway error rendered as `{"error": {...}}`.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::debug!("responding {status}: {}", self.0);
        }
        (status, Json(self.0.body())).into_response()
    }
}

fn body_bytes(body: Result<Bytes, BytesRejection>) -> Result<Bytes, ApiError> {
    body.map_err(|rejection| {
        ApiError(Error::malformed(format!(
            "unreadable request body: {}",
            rejection.body_text()
        )))
    })
}

async fn chat_completions<A: Adapter>(
    State(gateway): State<Gateway<A>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body_bytes(body)?;
    tracing::trace!("chat request: {}", String::from_utf8_lossy(&body));
    let request = ChatRequest::from_slice(&body)?;
    match gateway.chat(request).await? {
        Reply::Complete(response) => Ok(Json(response).into_response()),
        Reply::Stream(relay) => Ok(sse(relay, |chunk| chunk)),
    }
}

async fn completions<A: Adapter>(
    State(gateway): State<Gateway<A>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body_bytes(body)?;
    let request = CompletionRequest::chat_from_slice(&body)?;
    match gateway.chat(request).await? {
        Reply::Complete(response) => Ok(Json(TextCompletion::from(response)).into_response()),
        Reply::Stream(relay) => Ok(sse(relay, TextCompletion::from)),
    }
}

async fn models<A: Adapter>(State(gateway): State<Gateway<A>>) -> impl IntoResponse {
    Json(gateway.models())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "modelplex"}))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    tracing::debug!("no route for {uri}");
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": {"message": format!("no route for {}", uri.path()), "type": "not_found"}})),
    )
}

async fn method_not_allowed(method: Method, uri: Uri) -> impl IntoResponse {
    tracing::debug!("method {method} not allowed for {uri}");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({"error": {"message": format!("method {method} is not allowed here"), "type": "invalid_request_error"}})),
    )
}

/// Render a relay as SSE. A successful stream ends with `[DONE]`; a failed
/// one ends with a single error frame and no terminator.
fn sse<T, F>(relay: Relay, map: F) -> Response
where
    T: Serialize + Send + 'static,
    F: Fn(StreamChunk) -> T + Send + 'static,
{
    let events = async_stream::stream! {
        let mut relay = relay;
        let mut failed = false;
        while let Some(item) = relay.next().await {
            match item {
                Ok(chunk) => {
                    let event = frame(&map(chunk));
                    yield Ok::<_, Infallible>(event);
                }
                Err(e) => {
                    let event = frame(&e.body());
                    yield Ok(event);
                    failed = true;
                    break;
                }
            }
        }
        if !failed {
            yield Ok(Event::default().data("[DONE]"));
        }
    };
    Sse::new(events).into_response()
}

fn frame(payload: &impl Serialize) -> Event {
    match serde_json::to_string(payload) {
        Ok(data) => Event::default().data(data),
        Err(e) => {
            tracing::error!("failed to encode stream frame: {e}");
            let body = json!({"error": {"message": "encoding failure", "type": "stream_error"}});
            Event::default().data(body.to_string())
        }
    }
}
