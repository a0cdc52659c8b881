//! Provider adapter trait.

use crate::{ChatRequest, Response, Result, StreamChunk};
use compact_str::CompactString;
use futures_core::Stream;
use std::pin::Pin;

/// A boxed stream of unified chunks, detached from the adapter that
/// produced it so it can be driven from a spawned task.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send + 'static>>;

/// One upstream API family, translated to and from the unified schema.
///
/// Implementations own their HTTP client and credentials and keep no
/// per-request state, so a single instance serves concurrent requests.
/// Constructors are inherent methods on each adapter, never called
/// polymorphically.
pub trait Adapter: Clone + Send + Sync + 'static {
    /// Configured name of this provider, used for attribution.
    fn name(&self) -> &str;

    /// Model ids this adapter claims, in configured order.
    fn models(&self) -> &[CompactString];

    /// Translate, call upstream, and translate the full response back.
    fn send(&self, request: &ChatRequest) -> impl Future<Output = Result<Response>> + Send;

    /// Translate, call upstream, and translate each native chunk as it
    /// arrives. Dropping the stream cancels the upstream call.
    fn stream(&self, request: &ChatRequest) -> ChunkStream;
}
