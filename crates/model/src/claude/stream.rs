//! SSE event parsing for the Anthropic streaming Messages API.
//!
//! Anthropic streaming events differ from the unified chunk format:
//! - `message_start` carries the id, model and prompt token count
//! - `content_block_start` / `content_block_delta` carry text
//! - `message_delta` carries the stop reason and output token count
//! - `message_stop` ends the message
//! - `error` reports a failure after the 200 status was sent
//!
//! Chunk metadata only arrives once, so translation is stateful.

use compact_str::CompactString;
use mcore::{Delta, Error, FinishReason, Result, StreamChunk, Usage};
use serde::Deserialize;

/// A raw SSE event from the Anthropic streaming API.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Initial message metadata.
    MessageStart { message: MessageMeta },
    /// Begin a content block.
    ContentBlockStart { content_block: ContentBlock },
    /// Incremental content within a block.
    ContentBlockDelta { delta: BlockDelta },
    /// End of a content block.
    ContentBlockStop,
    /// Final message delta (stop reason + usage).
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: OutputUsage,
    },
    /// End of message.
    MessageStop,
    /// Keep-alive.
    Ping,
    /// Failure reported in-band.
    Error { error: ApiError },
    /// Catch-all for event types added later.
    #[serde(other)]
    Unknown,
}

/// `message` of a `message_start` event.
#[derive(Debug, Deserialize)]
pub struct MessageMeta {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub usage: InputUsage,
}

/// Prompt-side usage reported at message start.
#[derive(Debug, Default, Deserialize)]
pub struct InputUsage {
    #[serde(default)]
    pub input_tokens: u32,
}

/// Output-side usage reported in `message_delta`.
#[derive(Debug, Default, Deserialize)]
pub struct OutputUsage {
    #[serde(default)]
    pub output_tokens: u32,
}

/// Content block header. Only text is translated.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Incremental block content. Only text is translated.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

/// `delta` of a `message_delta` event.
#[derive(Debug, Deserialize)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<CompactString>,
}

/// Anthropic error object.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub kind: CompactString,
    pub message: String,
}

impl ApiError {
    /// Map onto the gateway taxonomy. Overload and internal errors are
    /// availability failures; everything else is a rejection.
    pub fn into_error(self, provider: &str) -> Error {
        match self.kind.as_str() {
            "overloaded_error" | "api_error" => {
                Error::unavailable(provider, format!("{}: {}", self.kind, self.message))
            }
            _ => Error::UpstreamRejected {
                provider: provider.into(),
                status: None,
                message: self.message,
            },
        }
    }
}

/// Normalize an Anthropic stop reason.
pub fn finish_reason(reason: &str) -> FinishReason {
    match reason {
        "max_tokens" => FinishReason::Length,
        "refusal" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

/// Turns Anthropic events into unified chunks for one message.
#[derive(Debug)]
pub struct Translator {
    provider: CompactString,
    id: String,
    model: String,
    created: u64,
    input_tokens: u32,
}

impl Translator {
    /// Start translating a stream requested for `model`.
    pub fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.into(),
            id: String::new(),
            model: model.to_owned(),
            created: mcore::unix_now(),
            input_tokens: 0,
        }
    }

    fn chunk(&self) -> StreamChunk {
        StreamChunk::new(self.id.clone(), self.model.clone(), self.created)
    }

    /// Translate one event. Events without output yield `None`.
    pub fn translate(&mut self, event: Event) -> Result<Option<StreamChunk>> {
        let chunk = match event {
            Event::MessageStart { message } => {
                self.id = message.id;
                self.model = message.model;
                self.input_tokens = message.usage.input_tokens;
                Some(self.chunk().with_delta(Delta::role()))
            }
            Event::ContentBlockStart {
                content_block: ContentBlock::Text { text },
            } if !text.is_empty() => Some(self.chunk().with_delta(Delta::text(text))),
            Event::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
            } => Some(self.chunk().with_delta(Delta::text(text))),
            Event::MessageDelta { delta, usage } => {
                let reason = delta
                    .stop_reason
                    .as_deref()
                    .map(finish_reason)
                    .unwrap_or(FinishReason::Stop);
                Some(
                    self.chunk()
                        .with_finish(reason)
                        .with_usage(Usage::new(self.input_tokens, usage.output_tokens)),
                )
            }
            Event::Error { error } => return Err(error.into_error(&self.provider)),
            Event::ContentBlockStart { .. }
            | Event::ContentBlockDelta { .. }
            | Event::ContentBlockStop
            | Event::MessageStop
            | Event::Ping
            | Event::Unknown => None,
        };
        Ok(chunk)
    }
}
