//! Request body for the Anthropic Messages API.

use super::DEFAULT_MAX_TOKENS;
use mcore::{ChatRequest, Role};
use serde::Serialize;

/// The request body for the Anthropic Messages API.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    /// The model identifier.
    pub model: &'a str,
    /// Maximum tokens to generate. Required by the API.
    pub max_tokens: u32,
    /// System prompt (top-level, not in messages array).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// The conversation turns, without system messages.
    pub messages: Vec<Turn<'a>>,
    /// Whether to stream the response.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    /// Temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Top-p sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Custom stop sequences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    /// Request metadata carrying the end-user id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata<'a>>,
}

/// A user or assistant turn.
#[derive(Debug, Serialize)]
pub struct Turn<'a> {
    /// `user` or `assistant`.
    pub role: &'static str,
    /// Plain text content.
    pub content: &'a str,
}

/// Anthropic request metadata.
#[derive(Debug, Serialize)]
pub struct Metadata<'a> {
    /// Opaque end-user identifier.
    pub user_id: &'a str,
}

impl Request<'_> {
    /// Enable streaming for the request.
    pub fn stream(mut self) -> Self {
        self.stream = true;
        self
    }
}

impl<'a> From<&'a ChatRequest> for Request<'a> {
    fn from(req: &'a ChatRequest) -> Self {
        let mut system = Vec::new();
        let mut messages = Vec::with_capacity(req.messages.len());
        for msg in &req.messages {
            match msg.role {
                Role::System => system.push(msg.content.as_str()),
                Role::User | Role::Assistant => messages.push(Turn {
                    role: msg.role.as_str(),
                    content: &msg.content,
                }),
            }
        }

        let sampling = &req.sampling;
        Self {
            model: &req.model,
            max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
            stream: false,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            stop_sequences: sampling.stop.as_ref().map(|s| s.to_vec()),
            metadata: sampling.user.as_deref().map(|user_id| Metadata { user_id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcore::{Message, Stop};
    use serde_json::json;

    #[test]
    fn system_messages_are_lifted() {
        let req = ChatRequest::new(
            "claude-3-sonnet",
            vec![
                Message::system("be brief"),
                Message::user("hi"),
                Message::system("be kind"),
                Message::assistant("hello"),
            ],
        );
        let body = serde_json::to_value(Request::from(&req)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-3-sonnet",
                "max_tokens": 4096,
                "system": "be brief\n\nbe kind",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                ],
            })
        );
    }

    #[test]
    fn sampling_and_stream() {
        let mut req = ChatRequest::new("claude-3-sonnet", vec![Message::user("hi")])
            .with_max_tokens(64);
        req.sampling.stop = Some(Stop::One("END".into()));
        req.sampling.top_p = Some(0.9);
        req.sampling.user = Some("u-1".into());
        req.sampling.seed = Some(7);

        let body = serde_json::to_value(Request::from(&req).stream()).unwrap();
        assert_eq!(body["max_tokens"], json!(64));
        assert_eq!(body["stop_sequences"], json!(["END"]));
        assert_eq!(body["top_p"], json!(0.9));
        assert_eq!(body["metadata"], json!({"user_id": "u-1"}));
        assert_eq!(body["stream"], json!(true));
        assert!(body.get("seed").is_none());
        assert!(body.get("system").is_none());
    }
}
