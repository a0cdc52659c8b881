//! Legacy prompt completions, served on top of chat.

use crate::{
    ChatRequest, Error, FinishReason, Message, Response, Result, Sampling, StreamChunk, Usage,
};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A legacy `/completions` request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionRequest {
    /// The model to use.
    pub model: CompactString,

    /// The prompt to complete.
    pub prompt: String,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether to stream the response.
    #[serde(default)]
    pub stream: bool,

    /// Sampling parameters.
    #[serde(flatten)]
    pub sampling: Sampling,
}

impl CompletionRequest {
    /// Decode a request body and convert it to a single-turn chat request.
    pub fn chat_from_slice(body: &[u8]) -> Result<ChatRequest> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| Error::malformed(format!("invalid JSON: {e}")))?;
        let chat = request.into_chat();
        chat.validate()?;
        Ok(chat)
    }

    /// The prompt becomes one user message.
    pub fn into_chat(self) -> ChatRequest {
        ChatRequest {
            model: self.model,
            messages: vec![Message::user(self.prompt)],
            max_tokens: self.max_tokens,
            stream: self.stream,
            sampling: self.sampling,
        }
    }
}

/// A legacy text completion response (or streamed chunk).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TextCompletion {
    /// Completion id.
    pub id: String,
    /// Always "text_completion".
    pub object: String,
    /// Creation time.
    pub created: u64,
    /// Model that produced the text.
    pub model: String,
    /// Generated alternatives.
    pub choices: Vec<TextChoice>,
    /// Token usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// A generated alternative of a text completion.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TextChoice {
    /// Generated text.
    pub text: String,
    /// Position in the list.
    pub index: u32,
    /// Why generation stopped.
    pub finish_reason: Option<FinishReason>,
}

impl TextCompletion {
    const OBJECT: &'static str = "text_completion";
}

impl From<Response> for TextCompletion {
    fn from(resp: Response) -> Self {
        Self {
            id: resp.id,
            object: Self::OBJECT.into(),
            created: resp.created,
            model: resp.model,
            choices: resp
                .choices
                .into_iter()
                .map(|c| TextChoice {
                    text: c.message.content,
                    index: c.index,
                    finish_reason: c.finish_reason,
                })
                .collect(),
            usage: resp.usage,
        }
    }
}

impl From<StreamChunk> for TextCompletion {
    fn from(chunk: StreamChunk) -> Self {
        Self {
            id: chunk.id,
            object: Self::OBJECT.into(),
            created: chunk.created,
            model: chunk.model,
            choices: chunk
                .choices
                .into_iter()
                .map(|c| TextChoice {
                    text: c.delta.content.unwrap_or_default(),
                    index: c.index,
                    finish_reason: c.finish_reason,
                })
                .collect(),
            usage: chunk.usage,
        }
    }
}
