//! Adapter implementation for the Ollama provider.

use super::{Ollama, Request};
use crate::{codec::LineDecoder, http};
use async_stream::try_stream;
use compact_str::CompactString;
use futures_util::StreamExt;
use mcore::{
    Adapter, ChatRequest, Choice, ChoiceMessage, ChunkStream, Delta, Error, FinishReason, Response,
    Result, Role, StreamChunk, Usage,
};
use serde::Deserialize;

/// One `/api/chat` object: the whole response, or one line of a stream.
#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
    done_reason: Option<CompactString>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// A stream line: progress, or an error reported mid-stream.
#[derive(Deserialize)]
#[serde(untagged)]
enum Line {
    Error { error: String },
    Chat(ChatResponse),
}

impl ChatResponse {
    fn reason(&self) -> FinishReason {
        match self.done_reason.as_deref() {
            Some("length") => FinishReason::Length,
            _ => FinishReason::Stop,
        }
    }

    fn usage(&self) -> Option<Usage> {
        match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(Usage::new(
                prompt.unwrap_or_default(),
                completion.unwrap_or_default(),
            )),
        }
    }
}

/// Ollama does not return completion ids.
fn completion_id() -> String {
    format!("chatcmpl-{}", ulid::Ulid::new())
}

impl Adapter for Ollama {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[CompactString] {
        &self.models
    }

    async fn send(&self, request: &ChatRequest) -> Result<Response> {
        let raw = match self.http.send::<Line>(&Request::from(request)).await? {
            Line::Chat(raw) => raw,
            Line::Error { error } => {
                return Err(Error::UpstreamRejected {
                    provider: self.name.clone(),
                    status: None,
                    message: error,
                });
            }
        };
        let reason = raw.reason();
        let usage = raw.usage();
        Ok(Response {
            id: completion_id(),
            object: Response::OBJECT.into(),
            created: mcore::unix_now(),
            model: raw.model.unwrap_or_else(|| request.model.to_string()),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage {
                    role: Role::Assistant,
                    content: raw.message.map(|m| m.content).unwrap_or_default(),
                },
                finish_reason: Some(reason),
            }],
            usage,
        })
    }

    fn stream(&self, request: &ChatRequest) -> ChunkStream {
        let builder = self.http.request(&Request::from(request).stream());
        let name = self.name.clone();
        let mut translator = Translator {
            provider: self.name.clone(),
            id: completion_id(),
            model: request.model.to_string(),
            created: mcore::unix_now(),
            started: false,
        };

        Box::pin(try_stream! {
            let response = http::open(&name, builder).await?;
            let mut body = response.bytes_stream();
            let mut decoder = LineDecoder::default();
            let mut done = false;
            while !done {
                let Some(bytes) = body.next().await else {
                    break;
                };
                let bytes = bytes.map_err(|e| Error::unavailable(&name, e))?;
                for line in decoder.push(&bytes) {
                    let (chunks, finished) = translator.translate(&line)?;
                    for chunk in chunks {
                        yield chunk;
                    }
                    if finished {
                        done = true;
                        break;
                    }
                }
            }
            if !done {
                if let Some(line) = decoder.finish() {
                    let (chunks, finished) = translator.translate(&line)?;
                    for chunk in chunks {
                        yield chunk;
                    }
                    done = finished;
                }
            }
            if !done {
                Err::<(), _>(Error::unavailable(
                    &name,
                    "upstream closed the stream before the final line",
                ))?;
            }
        })
    }
}

/// Per-stream state: Ollama lines carry no id, so one is minted up front.
struct Translator {
    provider: CompactString,
    id: String,
    model: String,
    created: u64,
    started: bool,
}

impl Translator {
    /// Translate one NDJSON line. Returns the chunks it produced and
    /// whether it was the final line.
    fn translate(&mut self, line: &str) -> Result<(Vec<StreamChunk>, bool)> {
        tracing::trace!("line: {line}");
        let raw = match serde_json::from_str::<Line>(line) {
            Ok(Line::Chat(raw)) => raw,
            Ok(Line::Error { error }) => {
                return Err(Error::UpstreamRejected {
                    provider: self.provider.clone(),
                    status: None,
                    message: error,
                });
            }
            Err(e) => {
                return Err(Error::translation(
                    &self.provider,
                    format!("invalid line: {e}, data: {line}"),
                ));
            }
        };
        if let Some(model) = &raw.model {
            self.model.clone_from(model);
        }

        let announce = !self.started;
        self.started = true;
        let chunk = || StreamChunk::new(self.id.clone(), self.model.clone(), self.created);
        let mut chunks = Vec::new();
        if announce {
            chunks.push(chunk().with_delta(Delta::role()));
        }
        if let Some(message) = &raw.message
            && !message.content.is_empty()
        {
            chunks.push(chunk().with_delta(Delta::text(message.content.clone())));
        }
        if raw.done {
            let mut last = chunk().with_finish(raw.reason());
            last.usage = raw.usage();
            chunks.push(last);
        }
        Ok((chunks, raw.done))
    }
}
