//! Request body for the Ollama chat API.

use mcore::{ChatRequest, Message};
use serde::Serialize;

/// Ollama `/api/chat` request body.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    /// The model identifier.
    pub model: &'a str,
    /// The messages; Ollama accepts the unified roles as-is.
    pub messages: &'a [Message],
    /// Ollama streams unless told otherwise, so this is always sent.
    pub stream: bool,
    /// Generation options.
    #[serde(skip_serializing_if = "Options::is_empty")]
    pub options: Options,
}

/// Ollama model options.
#[derive(Debug, Default, Serialize)]
pub struct Options {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
}

impl Options {
    fn is_empty(&self) -> bool {
        self.num_predict.is_none()
            && self.temperature.is_none()
            && self.top_p.is_none()
            && self.stop.is_none()
            && self.seed.is_none()
            && self.presence_penalty.is_none()
            && self.frequency_penalty.is_none()
    }
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
        let sampling = &req.sampling;
        Self {
            model: &req.model,
            messages: &req.messages,
            stream: false,
            options: Options {
                num_predict: req.max_tokens,
                temperature: sampling.temperature,
                top_p: sampling.top_p,
                stop: sampling.stop.as_ref().map(|s| s.to_vec()),
                seed: sampling.seed,
                presence_penalty: sampling.presence_penalty,
                frequency_penalty: sampling.frequency_penalty,
            },
        }
    }
}
