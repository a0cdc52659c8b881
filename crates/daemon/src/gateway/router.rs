//! Request router.
//!
//! Takes a decoded request through `Received → Resolved → Dispatched →
//! {Streaming →} Completed | Failed`. Every exchange emits exactly one
//! structured record when it reaches a terminal phase, or when it is
//! dropped before reaching one (the caller went away).
//!
//! Streams are driven by a spawned producer task that feeds a bounded
//! channel. The consumer half ([`Relay`]) aborts the producer when it is
//! dropped, which drops the upstream response and with it the connection.

use super::Gateway;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use mcore::{
    Adapter, ChatRequest, ChunkStream, Error, ModelList, Response, Result, StreamChunk, Usage,
};
use std::{
    pin::Pin,
    task::{Context, Poll},
    time::{Duration, Instant},
};
use tokio::{sync::mpsc, task::JoinHandle};
use ulid::Ulid;

/// Lifecycle phase of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Decoded, not yet routed.
    Received,
    /// An adapter claims the model.
    Resolved,
    /// The adapter has been invoked.
    Dispatched,
    /// Chunks are flowing to the caller.
    Streaming,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl Phase {
    /// Whether `self → next` is a legal transition.
    pub fn can_advance(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Received, Resolved | Failed)
                | (Resolved, Dispatched | Failed)
                | (Dispatched, Streaming | Completed | Failed)
                | (Streaming, Completed | Failed)
        )
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Bookkeeping for one request/response exchange.
#[derive(Debug)]
pub struct Exchange {
    id: Ulid,
    model: CompactString,
    provider: Option<CompactString>,
    stream: bool,
    phase: Phase,
    started: Instant,
}

impl Exchange {
    /// Start tracking a decoded request.
    pub fn new(request: &ChatRequest) -> Self {
        Self {
            id: Ulid::new(),
            model: request.model.clone(),
            provider: None,
            stream: request.stream,
            phase: Phase::Received,
            started: Instant::now(),
        }
    }

    /// Request id used in log records.
    pub fn id(&self) -> Ulid {
        self.id
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`. Illegal transitions are refused and logged, and the
    /// phase is left unchanged.
    pub fn advance(&mut self, next: Phase) -> bool {
        if !self.phase.can_advance(next) {
            tracing::error!(
                "request {}: illegal transition {:?} -> {:?}",
                self.id,
                self.phase,
                next
            );
            return false;
        }
        tracing::trace!("request {}: {:?} -> {:?}", self.id, self.phase, next);
        self.phase = next;
        true
    }

    fn resolved(&mut self, provider: &str) {
        self.provider = Some(provider.into());
        self.advance(Phase::Resolved);
    }

    /// Finish successfully and emit the completion record.
    pub fn complete(&mut self, usage: Option<Usage>) {
        if !self.advance(Phase::Completed) {
            return;
        }
        let usage = usage.unwrap_or_default();
        tracing::info!(
            request_id = %self.id,
            model = %self.model,
            provider = self.provider.as_deref().unwrap_or("-"),
            stream = self.stream,
            duration_ms = self.elapsed_ms(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            success = true,
            "request completed"
        );
    }

    /// Finish with `error` and emit the failure record. The full error,
    /// including causes hidden from the caller, goes to the log.
    pub fn fail(&mut self, error: &Error) {
        if !self.advance(Phase::Failed) {
            return;
        }
        tracing::warn!(
            request_id = %self.id,
            model = %self.model,
            provider = self.provider.as_deref().unwrap_or("-"),
            stream = self.stream,
            duration_ms = self.elapsed_ms(),
            success = false,
            error = error.kind(),
            "request failed: {error}"
        );
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        tracing::info!(
            request_id = %self.id,
            model = %self.model,
            provider = self.provider.as_deref().unwrap_or("-"),
            stream = self.stream,
            duration_ms = self.elapsed_ms(),
            success = false,
            error = "cancelled",
            "request cancelled in phase {:?}",
            self.phase
        );
    }
}

/// Outcome of a routed request.
pub enum Reply {
    /// A complete non-streaming response.
    Complete(Response),
    /// A live stream of chunks.
    Stream(Relay),
}

/// Consumer half of a streaming exchange.
///
/// Yields chunks in upstream order. An `Err` item is always the last one.
/// Dropping the relay aborts the producer and the upstream call.
pub struct Relay {
    first: Option<StreamChunk>,
    rx: mpsc::Receiver<Result<StreamChunk>>,
    _producer: AbortOnDrop,
}

impl Stream for Relay {
    type Item = Result<StreamChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(chunk) = self.first.take() {
            return Poll::Ready(Some(Ok(chunk)));
        }
        self.rx.poll_recv(cx)
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl<A: Adapter> Gateway<A> {
    /// Route a chat request to the adapter serving its model.
    ///
    /// For streaming requests this waits for the first upstream item, so
    /// failures that happen before any output (unreachable upstream,
    /// rejected request) are reported as errors rather than as a stream.
    pub async fn chat(&self, request: ChatRequest) -> Result<Reply> {
        let mut exchange = Exchange::new(&request);
        if let Err(e) = request.validate() {
            exchange.fail(&e);
            return Err(e);
        }
        let adapter = match self.registry.resolve(&request.model) {
            Ok(adapter) => adapter,
            Err(e) => {
                exchange.fail(&e);
                return Err(e);
            }
        };
        exchange.resolved(adapter.name());
        tracing::debug!(
            "request {}: model '{}' -> provider '{}'",
            exchange.id(),
            request.model,
            adapter.name()
        );

        exchange.advance(Phase::Dispatched);
        if request.stream {
            let upstream = adapter.stream(&request);
            self.relay(upstream, adapter.name(), exchange).await
        } else {
            let timeout = self.limits.request_timeout;
            let result = match tokio::time::timeout(timeout, adapter.send(&request)).await {
                Ok(result) => result,
                Err(_) => Err(Error::unavailable(
                    adapter.name(),
                    format!("no response within {}s", timeout.as_secs()),
                )),
            };
            match result {
                Ok(response) => {
                    exchange.complete(response.usage);
                    Ok(Reply::Complete(response))
                }
                Err(e) => {
                    exchange.fail(&e);
                    Err(e)
                }
            }
        }
    }

    /// The `/v1/models` payload.
    pub fn models(&self) -> ModelList {
        self.registry.model_list()
    }

    async fn relay(&self, upstream: ChunkStream, provider: &str, exchange: Exchange) -> Result<Reply> {
        let (tx, mut rx) = mpsc::channel(self.limits.stream_buffer);
        let producer = AbortOnDrop(tokio::spawn(produce(
            upstream,
            tx,
            exchange,
            provider.into(),
            self.limits.request_timeout,
        )));

        let first = match rx.recv().await {
            Some(Ok(chunk)) => Some(chunk),
            Some(Err(e)) => return Err(e),
            None => None,
        };
        Ok(Reply::Stream(Relay {
            first,
            rx,
            _producer: producer,
        }))
    }
}

/// Pump upstream chunks into `tx` until the upstream ends, fails, goes
/// idle for longer than `idle`, or the consumer disappears.
async fn produce(
    mut upstream: ChunkStream,
    tx: mpsc::Sender<Result<StreamChunk>>,
    mut exchange: Exchange,
    provider: CompactString,
    idle: Duration,
) {
    exchange.advance(Phase::Streaming);
    let mut usage = None;
    loop {
        let item = match tokio::time::timeout(idle, upstream.next()).await {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(_) => Err(Error::unavailable(
                &provider,
                format!("stream idle for {}s", idle.as_secs()),
            )),
        };
        match item {
            Ok(chunk) => {
                if chunk.usage.is_some() {
                    usage = chunk.usage;
                }
                if tx.send(Ok(chunk)).await.is_err() {
                    tracing::debug!("request {}: consumer closed", exchange.id());
                    return;
                }
            }
            Err(e) => {
                exchange.fail(&e);
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
    exchange.complete(usage);
}
