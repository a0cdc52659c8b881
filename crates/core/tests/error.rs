//! Tests for the error taxonomy and its caller-visible encoding.

use modelplex_core::Error;

#[test]
fn status_per_kind() {
    assert_eq!(Error::malformed("bad").status(), 400);
    assert_eq!(Error::UnknownModel("x".into()).status(), 404);
    assert_eq!(Error::unavailable("openai", "connect refused").status(), 503);
    assert_eq!(Error::translation("openai", "bad chunk").status(), 502);
}

#[test]
fn rejected_relays_client_status() {
    let err = Error::UpstreamRejected {
        provider: "anthropic".into(),
        status: Some(429),
        message: "rate limited".into(),
    };
    assert_eq!(err.status(), 429);

    let err = Error::UpstreamRejected {
        provider: "anthropic".into(),
        status: Some(200),
        message: "weird".into(),
    };
    assert_eq!(err.status(), 502);
}

#[test]
fn unavailable_hides_cause() {
    let err = Error::unavailable("openai", "tcp connect error: 10.0.0.1:443");
    let body = err.body();
    assert_eq!(body.error.message, "provider 'openai' is unavailable");
    assert_eq!(body.error.kind.as_str(), "upstream_unavailable");
    assert_eq!(body.error.provider.as_deref(), Some("openai"));
    assert!(err.is_retryable());
    assert!(err.to_string().contains("10.0.0.1"));
}

#[test]
fn rejected_message_is_verbatim() {
    let err = Error::UpstreamRejected {
        provider: "openai".into(),
        status: Some(400),
        message: "max_tokens is too large".into(),
    };
    let json = serde_json::to_value(err.body()).unwrap();
    assert_eq!(json["error"]["type"], "upstream_rejected");
    assert_eq!(json["error"]["provider"], "openai");
    assert_eq!(json["error"]["code"], 400);
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap()
            .ends_with("max_tokens is too large")
    );
    assert!(!err.is_retryable());
}

#[test]
fn client_errors_carry_no_provider() {
    let json = serde_json::to_value(Error::UnknownModel("unknown-model".into()).body()).unwrap();
    assert_eq!(json["error"]["type"], "model_not_found");
    assert!(json["error"].get("provider").is_none());
    assert!(json["error"].get("code").is_none());
}
