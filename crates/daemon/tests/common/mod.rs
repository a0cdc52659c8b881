//! Shared helpers: a scriptable in-process adapter and an HTTP/1 client
//! over the unix socket.

#![allow(dead_code)]

use bytes::Bytes;
use compact_str::CompactString;
use http::{Method, Request, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use mcore::{
    Adapter, ChatRequest, ChoiceMessage, Choice, ChunkStream, Delta, Error, FinishReason, Response,
    Result, Role, StreamChunk, Usage,
};
use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::task::JoinHandle;

/// How a [`Fake`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Reply "echo: <last message>", streamed one word per chunk.
    Echo,
    /// Stream a chunk every few milliseconds, forever.
    Endless,
    /// Never answer.
    Hang,
    /// Stream one chunk, then fail.
    FailMidStream,
    /// Refuse up front with a 429.
    Reject,
}

/// In-process adapter that counts calls and notices when a pending call
/// or its stream is dropped.
#[derive(Clone)]
pub struct Fake {
    pub name: CompactString,
    pub models: Vec<CompactString>,
    pub behavior: Behavior,
    pub calls: Arc<AtomicUsize>,
    pub dropped: Arc<AtomicBool>,
}

impl Fake {
    pub fn new(name: &str, models: &[&str], behavior: Behavior) -> Self {
        Self {
            name: name.into(),
            models: models.iter().map(|m| CompactString::from(*m)).collect(),
            behavior,
            calls: Arc::default(),
            dropped: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    fn reply(request: &ChatRequest) -> String {
        let last = request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        format!("echo: {last}")
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Adapter for Fake {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[CompactString] {
        &self.models
    }

    async fn send(&self, request: &ChatRequest) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Hang => {
                let _flag = DropFlag(self.dropped.clone());
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::unavailable(&self.name, "woke up"))
            }
            Behavior::Reject => Err(Error::UpstreamRejected {
                provider: self.name.clone(),
                status: Some(429),
                message: "slow down".into(),
            }),
            _ => Ok(Response {
                id: "fake-1".into(),
                object: Response::OBJECT.into(),
                created: 1,
                model: request.model.to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: ChoiceMessage {
                        role: Role::Assistant,
                        content: Self::reply(request),
                    },
                    finish_reason: Some(FinishReason::Stop),
                }],
                usage: Some(Usage::new(3, 2)),
            }),
        }
    }

    fn stream(&self, request: &ChatRequest) -> ChunkStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior;
        let name = self.name.clone();
        let model = request.model.to_string();
        let reply = Self::reply(request);
        let flag = DropFlag(self.dropped.clone());
        Box::pin(async_stream::stream! {
            let _flag = flag;
            let base = StreamChunk::new("fake-1", model.as_str(), 1);
            match behavior {
                Behavior::Echo => {
                    yield Ok(base.clone().with_delta(Delta::role()));
                    for (i, word) in reply.split(' ').enumerate() {
                        let text = if i == 0 { word.to_owned() } else { format!(" {word}") };
                        yield Ok(base.clone().with_delta(Delta::text(text)));
                    }
                    yield Ok(base.clone().with_finish(FinishReason::Stop).with_usage(Usage::new(3, 2)));
                }
                Behavior::Endless => {
                    loop {
                        yield Ok(base.clone().with_delta(Delta::text("tick ")));
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                }
                Behavior::FailMidStream => {
                    yield Ok(base.clone().with_delta(Delta::text("partial")));
                    yield Err(Error::translation(&name, "garbled chunk"));
                }
                Behavior::Reject => {
                    yield Err(Error::UpstreamRejected {
                        provider: name.clone(),
                        status: Some(429),
                        message: "slow down".into(),
                    });
                }
            }
        })
    }
}

/// Poll `cond` for up to five seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// Start one request over a fresh connection without waiting for the
/// reply. Aborting both returned tasks closes the connection.
pub async fn dispatch(
    socket: &Path,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (
    JoinHandle<hyper::Result<hyper::Response<Incoming>>>,
    JoinHandle<hyper::Result<()>>,
) {
    let stream = tokio::net::UnixStream::connect(socket).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    let conn = tokio::spawn(conn);

    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "localhost")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.unwrap_or_default())))
        .unwrap();
    let response = tokio::spawn(async move { sender.send_request(request).await });
    (response, conn)
}

/// Open an HTTP/1 connection over the socket and send one request.
/// Aborting the returned task closes the connection.
pub async fn open(
    socket: &Path,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (hyper::Response<Incoming>, JoinHandle<hyper::Result<()>>) {
    let (response, conn) = dispatch(socket, method, uri, body).await;
    (response.await.unwrap().unwrap(), conn)
}

/// Send one request on a fresh connection.
pub async fn send(socket: &Path, method: Method, uri: &str, body: Option<String>) -> hyper::Response<Incoming> {
    open(socket, method, uri, body).await.0
}

/// Send a request and collect the whole body.
pub async fn call(socket: &Path, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Bytes) {
    let response = send(socket, method, uri, body).await;
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

/// `POST` JSON and parse the JSON reply.
pub async fn post_json(socket: &Path, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = call(socket, Method::POST, uri, Some(body.to_string())).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

/// The `data:` payloads of an SSE body, in order.
pub fn sse_data(body: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(body)
        .split("\n\n")
        .filter_map(|event| {
            let data: Vec<_> = event
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            (!data.is_empty()).then(|| data.join("\n"))
        })
        .collect()
}
