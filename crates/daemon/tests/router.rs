//! Tests for request routing through `Gateway::chat`.

mod common;

use common::{Behavior, Fake, eventually};
use futures_util::StreamExt;
use mcore::{ChatRequest, Error, Message};
use model::Registry;
use modelplex_daemon::{Gateway, Limits, Reply};
use std::time::Duration;

fn gateway(fakes: &[Fake], limits: Limits) -> Gateway<Fake> {
    Gateway::new(Registry::new(fakes.to_vec()).unwrap(), limits)
}

fn limits(timeout_ms: u64) -> Limits {
    Limits {
        request_timeout: Duration::from_millis(timeout_ms),
        ..Limits::default()
    }
}

fn request(model: &str) -> ChatRequest {
    ChatRequest::new(model, vec![Message::user("hi")])
}

#[tokio::test]
async fn routes_to_the_owning_adapter() {
    let openai = Fake::new("openai", &["gpt-4"], Behavior::Echo);
    let anthropic = Fake::new("anthropic", &["claude-3-sonnet"], Behavior::Echo);
    let gateway = gateway(&[openai.clone(), anthropic.clone()], Limits::default());

    let Reply::Complete(response) = gateway.chat(request("claude-3-sonnet")).await.unwrap() else {
        panic!("expected a complete response");
    };
    assert_eq!(response.content(), Some("echo: hi"));
    assert_eq!(response.model, "claude-3-sonnet");
    assert_eq!(anthropic.calls(), 1);
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn unknown_model_makes_no_upstream_call() {
    let openai = Fake::new("openai", &["gpt-4"], Behavior::Echo);
    let gateway = gateway(&[openai.clone()], Limits::default());

    let err = gateway.chat(request("unknown-model")).await.err().unwrap();
    assert!(matches!(err, Error::UnknownModel(_)));
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn invalid_request_makes_no_upstream_call() {
    let openai = Fake::new("openai", &["gpt-4"], Behavior::Echo);
    let gateway = gateway(&[openai.clone()], Limits::default());

    let err = gateway
        .chat(ChatRequest::new("gpt-4", vec![]))
        .await
        .err()
        .unwrap();
    assert_eq!(err.status(), 400);
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn stream_relays_chunks_in_order() {
    let openai = Fake::new("openai", &["gpt-4"], Behavior::Echo);
    let gateway = gateway(&[openai], Limits::default());

    let whole = match gateway.chat(request("gpt-4")).await.unwrap() {
        Reply::Complete(response) => response,
        Reply::Stream(_) => panic!("expected a complete response"),
    };
    let Reply::Stream(relay) = gateway.chat(request("gpt-4").with_stream(true)).await.unwrap()
    else {
        panic!("expected a stream");
    };
    let chunks: Vec<_> = relay.collect().await;
    let text: String = chunks
        .iter()
        .map(|c| c.as_ref().unwrap())
        .filter_map(|c| c.content())
        .collect();
    assert_eq!(Some(text.as_str()), whole.content());
}

#[tokio::test]
async fn rejection_before_first_chunk_is_an_error() {
    let openai = Fake::new("openai", &["gpt-4"], Behavior::Reject);
    let gateway = gateway(&[openai], Limits::default());

    let err = gateway
        .chat(request("gpt-4").with_stream(true))
        .await
        .err()
        .unwrap();
    assert_eq!(err.status(), 429);
}

#[tokio::test]
async fn mid_stream_failure_is_the_last_item() {
    let openai = Fake::new("openai", &["gpt-4"], Behavior::FailMidStream);
    let gateway = gateway(&[openai], Limits::default());

    let Reply::Stream(relay) = gateway.chat(request("gpt-4").with_stream(true)).await.unwrap()
    else {
        panic!("expected a stream");
    };
    let items: Vec<_> = relay.collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().content(), Some("partial"));
    assert!(matches!(items[1], Err(Error::StreamTranslationFailure { .. })));
}

#[tokio::test]
async fn dropping_the_relay_cancels_upstream() {
    let openai = Fake::new("openai", &["gpt-4"], Behavior::Endless);
    let gateway = gateway(&[openai.clone()], Limits::default());

    let Reply::Stream(mut relay) = gateway.chat(request("gpt-4").with_stream(true)).await.unwrap()
    else {
        panic!("expected a stream");
    };
    assert!(relay.next().await.unwrap().is_ok());
    assert!(relay.next().await.unwrap().is_ok());
    assert!(!openai.was_dropped());

    drop(relay);
    assert!(eventually(|| openai.was_dropped()).await);
}

#[tokio::test]
async fn slow_upstream_times_out_as_unavailable() {
    let openai = Fake::new("openai", &["gpt-4"], Behavior::Hang);
    let gateway = gateway(&[openai], limits(50));

    let err = gateway.chat(request("gpt-4")).await.err().unwrap();
    assert!(matches!(err, Error::UpstreamUnavailable { .. }));
    assert_eq!(err.status(), 503);
}

#[tokio::test]
async fn idle_stream_times_out_as_unavailable() {
    let openai = Fake::new("openai", &["gpt-4"], Behavior::Hang);
    let gateway = gateway(&[openai.clone()], limits(50));

    let err = gateway
        .chat(request("gpt-4").with_stream(true))
        .await
        .err()
        .unwrap();
    assert!(err.is_retryable());
    assert!(eventually(|| openai.was_dropped()).await);
}

#[tokio::test]
async fn models_lists_every_registration() {
    let gateway = gateway(
        &[
            Fake::new("openai", &["gpt-4", "gpt-3.5-turbo"], Behavior::Echo),
            Fake::new("anthropic", &["claude-3-sonnet"], Behavior::Echo),
        ],
        Limits::default(),
    );
    let ids: Vec<_> = gateway.models().data.into_iter().map(|m| m.id).collect();
    assert_eq!(ids, ["gpt-4", "gpt-3.5-turbo", "claude-3-sonnet"]);
}
