//! Tests for the Claude (Anthropic) adapter against a mock upstream.

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use futures_util::StreamExt;
use mcore::{Adapter, ChatRequest, Error, FinishReason, Message, Role, Usage};
use modelplex_model::{Client, Provider, ProviderConfig, ProviderKind, build_provider};
use serde_json::{Value, json};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

fn provider(base: &str) -> Provider {
    let config = ProviderConfig::new("anthropic", ProviderKind::Anthropic, ["claude-3-sonnet"])
        .with_base_url(format!("{base}/v1"))
        .with_api_key("ak-test");
    build_provider(&config, Client::new()).unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new(
        "claude-3-sonnet",
        vec![Message::system("be brief"), Message::user("Say hello")],
    )
}

fn event(name: &str, data: Value) -> String {
    format!("event: {name}\ndata: {data}\n\n")
}

/// Rejects requests that were not translated to the Messages shape,
/// otherwise answers "Hello there!" as one message or as typed events.
async fn messages(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    let version = headers.get("anthropic-version").and_then(|v| v.to_str().ok());
    if key != Some("ak-test") || version != Some("2023-06-01") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"type": "error", "error": {"type": "authentication_error", "message": "bad headers"}})),
        )
            .into_response();
    }
    if body["system"] != json!("be brief")
        || body["max_tokens"] != json!(4096)
        || body["messages"] != json!([{"role": "user", "content": "Say hello"}])
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"type": "error", "error": {"type": "invalid_request_error", "message": format!("unexpected body {body}")}})),
        )
            .into_response();
    }

    if body["stream"] != json!(true) {
        return Json(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-sonnet-20240229",
            "content": [
                {"type": "text", "text": "Hello"},
                {"type": "text", "text": " there!"},
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 3},
        }))
        .into_response();
    }

    let sse = [
        event(
            "message_start",
            json!({"type": "message_start", "message": {"id": "msg_01", "type": "message", "role": "assistant", "model": "claude-3-sonnet-20240229", "content": [], "usage": {"input_tokens": 10, "output_tokens": 1}}}),
        ),
        event(
            "content_block_start",
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        ),
        event("ping", json!({"type": "ping"})),
        event(
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hello"}}),
        ),
        event(
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": " there!"}}),
        ),
        event(
            "content_block_stop",
            json!({"type": "content_block_stop", "index": 0}),
        ),
        event(
            "message_delta",
            json!({"type": "message_delta", "delta": {"stop_reason": "end_turn", "stop_sequence": null}, "usage": {"output_tokens": 3}}),
        ),
        event("message_stop", json!({"type": "message_stop"})),
    ]
    .concat();
    ([(header::CONTENT_TYPE, "text/event-stream")], sse).into_response()
}

#[tokio::test]
async fn send_translates_message() {
    let base = serve(Router::new().route("/v1/messages", post(messages))).await;
    let response = provider(&base).send(&request()).await.unwrap();

    assert_eq!(response.id, "msg_01");
    assert_eq!(response.object, "chat.completion");
    assert_eq!(response.model, "claude-3-sonnet-20240229");
    assert_eq!(response.choices[0].message.role, Role::Assistant);
    assert_eq!(response.content(), Some("Hello there!"));
    assert_eq!(response.reason(), Some(FinishReason::Stop));
    assert_eq!(response.usage, Some(Usage::new(10, 3)));
}

#[tokio::test]
async fn streamed_content_matches_message() {
    let base = serve(Router::new().route("/v1/messages", post(messages))).await;
    let provider = provider(&base);

    let whole = provider.send(&request()).await.unwrap();
    let chunks: Vec<_> = provider
        .stream(&request().with_stream(true))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    let streamed: String = chunks.iter().filter_map(|c| c.content()).collect();
    assert_eq!(Some(streamed.as_str()), whole.content());
    assert!(chunks.iter().all(|c| c.id == "msg_01"));
    assert_eq!(chunks[0].choices[0].delta.role, Some(Role::Assistant));

    let last = chunks.last().unwrap();
    assert_eq!(last.reason(), Some(FinishReason::Stop));
    assert_eq!(last.usage, Some(Usage::new(10, 3)));
}

#[tokio::test]
async fn upstream_validation_error_is_relayed() {
    let base = serve(Router::new().route("/v1/messages", post(messages))).await;
    let req = ChatRequest::new("claude-3-sonnet", vec![Message::user("different")]);
    let err = provider(&base).send(&req).await.unwrap_err();

    assert_eq!(err.status(), 400);
    assert!(err.to_string().contains("unexpected body"));
}

#[tokio::test]
async fn in_stream_error_event_terminates_stream() {
    let router = Router::new().route(
        "/v1/messages",
        post(|| async {
            let sse = [
                event(
                    "message_start",
                    json!({"type": "message_start", "message": {"id": "msg_02", "model": "claude-3-sonnet", "usage": {"input_tokens": 1}}}),
                ),
                event(
                    "error",
                    json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
                ),
            ]
            .concat();
            ([(header::CONTENT_TYPE, "text/event-stream")], sse)
        }),
    );
    let base = serve(router).await;
    let items: Vec<_> = provider(&base)
        .stream(&request().with_stream(true))
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(matches!(items[1], Err(Error::UpstreamUnavailable { .. })));
}

#[tokio::test]
async fn stream_cut_before_message_stop_is_unavailable() {
    let router = Router::new().route(
        "/v1/messages",
        post(|| async {
            let sse = [
                event(
                    "message_start",
                    json!({"type": "message_start", "message": {"id": "msg_03", "model": "claude-3-sonnet", "usage": {"input_tokens": 1}}}),
                ),
                event(
                    "content_block_delta",
                    json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hel"}}),
                ),
            ]
            .concat();
            ([(header::CONTENT_TYPE, "text/event-stream")], sse)
        }),
    );
    let base = serve(router).await;
    let items: Vec<_> = provider(&base)
        .stream(&request().with_stream(true))
        .collect()
        .await;

    let (last, chunks) = items.split_last().unwrap();
    assert!(chunks.iter().all(|c| c.is_ok()));
    let text: String = chunks
        .iter()
        .filter_map(|c| c.as_ref().ok().and_then(|c| c.content()))
        .collect();
    assert_eq!(text, "Hel");
    assert!(matches!(last, Err(Error::UpstreamUnavailable { .. })));
}
