//! Adapter implementation for the OpenAI-compatible provider.

use super::{OpenAI, Request};
use crate::{codec::SseDecoder, http};
use async_stream::try_stream;
use compact_str::CompactString;
use futures_util::StreamExt;
use mcore::{
    Adapter, ChatRequest, Choice, ChoiceMessage, ChunkStream, Delta, Error, FinishReason, Response,
    Result, Role, StreamChoice, StreamChunk, Usage,
};
use serde::Deserialize;

const TRUNCATED: &str = "upstream closed the stream before its end marker";

/// Raw non-streaming response. Fields upstreams commonly omit are
/// defaulted rather than rejected.
#[derive(Deserialize)]
struct Completion {
    #[serde(default)]
    id: String,
    created: Option<u64>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    index: u32,
    message: CompletionMessage,
    finish_reason: Option<CompactString>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// A non-streaming body: the completion, or an error reported with a
/// success status.
#[derive(Deserialize)]
#[serde(untagged)]
enum Reply {
    Error { error: ApiError },
    Completion(Completion),
}

/// One `data:` payload of a stream: a chunk, or an in-band error.
#[derive(Deserialize)]
#[serde(untagged)]
enum Frame {
    Error { error: ApiError },
    Chunk(Chunk),
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct Chunk {
    #[serde(default)]
    id: String,
    created: Option<u64>,
    model: Option<String>,
    choices: Vec<ChunkChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<CompactString>,
}

#[derive(Default, Deserialize)]
struct ChunkDelta {
    role: Option<CompactString>,
    content: Option<String>,
}

impl Adapter for OpenAI {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[CompactString] {
        &self.models
    }

    async fn send(&self, request: &ChatRequest) -> Result<Response> {
        match self.http.send(&Request::from(request)).await? {
            Reply::Completion(raw) => Ok(to_response(raw, &request.model)),
            Reply::Error { error } => Err(in_band_error(&self.name, error)),
        }
    }

    fn stream(&self, request: &ChatRequest) -> ChunkStream {
        let builder = self.http.request(&Request::from(request).stream());
        let name = self.name.clone();
        let model = request.model.clone();

        Box::pin(try_stream! {
            let response = http::open(&name, builder).await?;
            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::default();
            let mut done = false;
            let mut finished = false;
            while !done {
                let Some(bytes) = body.next().await else {
                    break;
                };
                let bytes = bytes.map_err(|e| Error::unavailable(&name, e))?;
                for event in decoder.push(&bytes) {
                    match parse_frame(&name, &event.data, &model)? {
                        Some(chunk) => {
                            finished |= chunk.reason().is_some();
                            yield chunk;
                        }
                        None => {
                            done = true;
                            break;
                        }
                    }
                }
            }
            if !done {
                if let Some(event) = decoder.finish() {
                    match parse_frame(&name, &event.data, &model)? {
                        Some(chunk) => {
                            finished |= chunk.reason().is_some();
                            yield chunk;
                        }
                        None => done = true,
                    }
                }
            }
            // Some compatible servers omit `[DONE]` after the final chunk.
            if !done && !finished {
                Err::<(), _>(Error::unavailable(&name, TRUNCATED))?;
            }
        })
    }
}

/// Translate one SSE payload. `None` marks the `[DONE]` sentinel.
fn parse_frame(provider: &str, data: &str, model: &str) -> Result<Option<StreamChunk>> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(None);
    }
    tracing::trace!("chunk: {data}");
    match serde_json::from_str::<Frame>(data) {
        Ok(Frame::Chunk(chunk)) => Ok(Some(to_chunk(chunk, model))),
        Ok(Frame::Error { error }) => Err(in_band_error(provider, error)),
        Err(e) => Err(Error::translation(
            provider,
            format!("invalid chunk: {e}, data: {data}"),
        )),
    }
}

/// Errors reported inside a 200 stream carry no status; server-side kinds
/// are treated as availability failures.
fn in_band_error(provider: &str, error: ApiError) -> Error {
    match error.kind.as_deref() {
        Some("server_error" | "overloaded_error" | "api_error") => {
            Error::unavailable(provider, error.message)
        }
        _ => Error::UpstreamRejected {
            provider: provider.into(),
            status: None,
            message: error.message,
        },
    }
}

fn to_response(raw: Completion, model: &str) -> Response {
    Response {
        id: raw.id,
        object: Response::OBJECT.into(),
        created: raw.created.unwrap_or_else(mcore::unix_now),
        model: raw.model.unwrap_or_else(|| model.to_owned()),
        choices: raw
            .choices
            .into_iter()
            .map(|c| Choice {
                index: c.index,
                message: ChoiceMessage {
                    role: Role::Assistant,
                    content: c.message.content.unwrap_or_default(),
                },
                finish_reason: c.finish_reason.as_deref().map(FinishReason::from_openai),
            })
            .collect(),
        usage: raw.usage,
    }
}

fn to_chunk(raw: Chunk, model: &str) -> StreamChunk {
    let mut chunk = StreamChunk::new(
        raw.id,
        raw.model.unwrap_or_else(|| model.to_owned()),
        raw.created.unwrap_or_else(mcore::unix_now),
    );
    chunk.choices = raw
        .choices
        .into_iter()
        .map(|c| StreamChoice {
            index: c.index,
            delta: Delta {
                role: c.delta.role.map(|_| Role::Assistant),
                content: c.delta.content,
            },
            finish_reason: c.finish_reason.as_deref().map(FinishReason::from_openai),
        })
        .collect();
    chunk.usage = raw.usage;
    chunk
}
