//! Request body for the OpenAI chat completions API.

use mcore::{ChatRequest, Message, Sampling};
use serde::Serialize;

/// OpenAI chat completions request body, borrowed from the unified request.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    /// The model identifier.
    pub model: &'a str,
    /// The messages, forwarded as-is.
    pub messages: &'a [Message],
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether to stream the response.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    /// Asks for a trailing usage chunk when streaming.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    /// Sampling parameters, forwarded as-is.
    #[serde(flatten)]
    pub sampling: &'a Sampling,
}

/// `stream_options` of a streaming request.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StreamOptions {
    /// Report token usage in a final chunk.
    pub include_usage: bool,
}

impl<'a> Request<'a> {
    /// Enable streaming with usage reporting.
    pub fn stream(mut self) -> Self {
        self.stream = true;
        self.stream_options = Some(StreamOptions {
            include_usage: true,
        });
        self
    }
}

impl<'a> From<&'a ChatRequest> for Request<'a> {
    fn from(req: &'a ChatRequest) -> Self {
        Self {
            model: &req.model,
            messages: &req.messages,
            max_tokens: req.max_tokens,
            stream: false,
            stream_options: None,
            sampling: &req.sampling,
        }
    }
}
