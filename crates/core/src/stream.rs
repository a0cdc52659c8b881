//! Streaming response abstractions for the unified interface

use crate::{FinishReason, Role, Usage};
use serde::{Deserialize, Serialize};

/// A streaming chat completion chunk
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StreamChunk {
    /// A unique identifier for the chat completion
    pub id: String,

    /// The object type, always "chat.completion.chunk"
    pub object: String,

    /// Unix timestamp (in seconds) of when the chunk was created
    pub created: u64,

    /// The model used for the completion
    pub model: String,

    /// The list of completion choices (with delta content)
    pub choices: Vec<StreamChoice>,

    /// Token usage statistics (only in final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// The `object` value of a streamed chunk.
    pub const OBJECT: &'static str = "chat.completion.chunk";

    /// Create an empty chunk carrying the completion metadata.
    pub fn new(id: impl Into<String>, model: impl Into<String>, created: u64) -> Self {
        Self {
            id: id.into(),
            object: Self::OBJECT.into(),
            created,
            model: model.into(),
            choices: Vec::new(),
            usage: None,
        }
    }

    /// Attach a single choice with the given delta.
    pub fn with_delta(mut self, delta: Delta) -> Self {
        self.choices = vec![StreamChoice {
            index: 0,
            delta,
            finish_reason: None,
        }];
        self
    }

    /// Attach a single choice carrying only a finish reason.
    pub fn with_finish(mut self, reason: FinishReason) -> Self {
        self.choices = vec![StreamChoice {
            index: 0,
            delta: Delta::default(),
            finish_reason: Some(reason),
        }];
        self
    }

    /// Attach usage statistics.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Get the content of the first choice
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }

    /// Get the reason the model stopped generating
    pub fn reason(&self) -> Option<FinishReason> {
        self.choices.first().and_then(|choice| choice.finish_reason)
    }
}

/// A completion choice in a streaming response
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StreamChoice {
    /// The index of this choice in the list
    pub index: u32,

    /// The delta content for this chunk
    pub delta: Delta,

    /// The reason the model stopped generating
    pub finish_reason: Option<FinishReason>,
}

/// Delta content in a streaming response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Delta {
    /// The role of the message author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// The content delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Delta {
    /// A delta announcing the assistant role.
    pub fn role() -> Self {
        Self {
            role: Some(Role::Assistant),
            content: Some(String::new()),
        }
    }

    /// A delta carrying text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            role: None,
            content: Some(content.into()),
        }
    }
}
