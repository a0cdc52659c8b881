//! Chat response abstractions for the unified interface

use crate::Role;
use serde::{Deserialize, Serialize};

/// A non-streaming chat completion response
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Response {
    /// A unique identifier for the chat completion
    pub id: String,

    /// The object type, always "chat.completion"
    pub object: String,

    /// Unix timestamp (in seconds) of when the response was created
    pub created: u64,

    /// The model used for the completion
    pub model: String,

    /// The list of completion choices
    pub choices: Vec<Choice>,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Response {
    /// The `object` value of a chat completion.
    pub const OBJECT: &'static str = "chat.completion";

    /// Get the content of the first choice
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
    }

    /// Get the reason the model stopped generating
    pub fn reason(&self) -> Option<FinishReason> {
        self.choices.first().and_then(|choice| choice.finish_reason)
    }
}

/// A completion choice in a non-streaming response
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Choice {
    /// The index of this choice in the list
    pub index: u32,

    /// The generated message
    pub message: ChoiceMessage,

    /// The reason the model stopped generating
    pub finish_reason: Option<FinishReason>,
}

/// The generated message of a choice
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChoiceMessage {
    /// The role of the author, always assistant for generated text
    pub role: Role,

    /// The generated text
    pub content: String,
}

/// The reason the model stopped generating, normalized across providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model finished naturally or hit a stop sequence
    Stop,

    /// The model hit the max token limit
    Length,

    /// Content was filtered
    ContentFilter,

    /// Generation ended because of an upstream error
    Error,
}

impl FinishReason {
    /// Normalize an OpenAI-style finish reason. Unknown values map to
    /// [`FinishReason::Stop`].
    pub fn from_openai(reason: &str) -> Self {
        match reason {
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            "error" => Self::Error,
            _ => Self::Stop,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Usage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,

    /// Number of tokens in the completion
    pub completion_tokens: u32,

    /// Total number of tokens used
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage from prompt and completion counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}
