//! Chat request type.

use crate::{Error, Message, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A unified chat completion request, as sent by local callers.
///
/// Provider adapters translate this into their native wire format.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatRequest {
    /// The model to use. Routed by exact match.
    pub model: CompactString,

    /// The conversation messages, in order.
    pub messages: Vec<Message>,

    /// Maximum tokens to generate.
    #[serde(
        default,
        alias = "max_completion_tokens",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_tokens: Option<u32>,

    /// Whether to stream the response.
    #[serde(default)]
    pub stream: bool,

    /// Provider-agnostic sampling parameters.
    #[serde(flatten)]
    pub sampling: Sampling,
}

/// Optional sampling parameters understood by every adapter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Sampling {
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Nucleus sampling probability mass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Stop sequences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Stop>,

    /// Presence penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,

    /// Frequency penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,

    /// Deterministic sampling seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// End-user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Stop sequences: a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Stop {
    /// A single stop sequence.
    One(String),
    /// Several stop sequences.
    Many(Vec<String>),
}

impl Stop {
    /// The stop sequences as a list.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s.clone()],
            Self::Many(v) => v.clone(),
        }
    }
}

impl ChatRequest {
    /// Create a non-streaming request for the given model.
    pub fn new(model: impl Into<CompactString>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            stream: false,
            sampling: Sampling::default(),
        }
    }

    /// Decode and validate a request body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let request: Self =
            serde_json::from_slice(body).map_err(|e| Error::malformed(format!("invalid JSON: {e}")))?;
        request.validate()?;
        Ok(request)
    }

    /// Check the invariants: non-empty model and messages.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::malformed("`model` must not be empty"));
        }
        if self.messages.is_empty() {
            return Err(Error::malformed("`messages` must not be empty"));
        }
        Ok(())
    }

    /// Set the streaming flag.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set the token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
