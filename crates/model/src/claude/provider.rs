//! Adapter implementation for the Claude (Anthropic) provider.

use super::{
    Claude, Request,
    stream::{Event, Translator, finish_reason},
};
use crate::{
    codec::{SseDecoder, SseEvent},
    http,
};
use async_stream::try_stream;
use compact_str::CompactString;
use futures_util::StreamExt;
use mcore::{
    Adapter, ChatRequest, Choice, ChoiceMessage, ChunkStream, Error, FinishReason, Response,
    Result, Role, Usage,
};
use serde::Deserialize;

/// Raw Anthropic non-streaming response.
#[derive(Deserialize)]
struct MessageResponse {
    id: String,
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<CompactString>,
    usage: Option<MessageUsage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct MessageUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl Adapter for Claude {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[CompactString] {
        &self.models
    }

    async fn send(&self, request: &ChatRequest) -> Result<Response> {
        let raw: MessageResponse = self.http.send(&Request::from(request)).await?;
        Ok(to_response(raw))
    }

    fn stream(&self, request: &ChatRequest) -> ChunkStream {
        let builder = self.http.request(&Request::from(request).stream());
        let name = self.name.clone();
        let mut translator = Translator::new(&self.name, &request.model);

        Box::pin(try_stream! {
            let response = http::open(&name, builder).await?;
            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::default();
            let mut done = false;
            while !done {
                let Some(bytes) = body.next().await else {
                    break;
                };
                let bytes = bytes.map_err(|e| Error::unavailable(&name, e))?;
                for event in decoder.push(&bytes) {
                    match decode(&name, &event)? {
                        Event::MessageStop => {
                            done = true;
                            break;
                        }
                        event => {
                            if let Some(chunk) = translator.translate(event)? {
                                yield chunk;
                            }
                        }
                    }
                }
            }
            if !done {
                if let Some(event) = decoder.finish() {
                    match decode(&name, &event)? {
                        Event::MessageStop => done = true,
                        event => {
                            if let Some(chunk) = translator.translate(event)? {
                                yield chunk;
                            }
                        }
                    }
                }
            }
            if !done {
                Err::<(), _>(Error::unavailable(
                    &name,
                    "upstream closed the stream before message_stop",
                ))?;
            }
        })
    }
}

fn decode(provider: &str, event: &SseEvent) -> Result<Event> {
    tracing::trace!("event {:?}: {}", event.event, event.data);
    serde_json::from_str(&event.data).map_err(|e| {
        Error::translation(
            provider,
            format!("invalid event: {e}, data: {}", event.data),
        )
    })
}

/// Text blocks are concatenated without a separator, matching what the
/// streamed deltas add up to.
fn to_response(raw: MessageResponse) -> Response {
    let content: String = raw
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect();
    let reason = raw
        .stop_reason
        .as_deref()
        .map(finish_reason)
        .unwrap_or(FinishReason::Stop);

    Response {
        id: raw.id,
        object: Response::OBJECT.into(),
        created: mcore::unix_now(),
        model: raw.model,
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: Role::Assistant,
                content,
            },
            finish_reason: Some(reason),
        }],
        usage: raw
            .usage
            .map(|u| Usage::new(u.input_tokens, u.output_tokens)),
    }
}
