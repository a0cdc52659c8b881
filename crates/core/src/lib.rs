//! Modelplex core: the unified OpenAI-compatible schema shared by the
//! listener, the router and every provider adapter.
//!
//! Provides the request/response/stream types, the closed error taxonomy,
//! and the [`Adapter`] trait implemented once per upstream API family.

pub use adapter::{Adapter, ChunkStream};
pub use completion::{CompletionRequest, TextChoice, TextCompletion};
pub use error::{Error, ErrorBody, ErrorDetail, Result};
pub use message::{Message, Role};
pub use models::{ModelList, ModelObject};
pub use request::{ChatRequest, Sampling, Stop};
pub use response::{Choice, ChoiceMessage, FinishReason, Response, Usage};
pub use stream::{Delta, StreamChoice, StreamChunk};

mod adapter;
mod completion;
mod error;
mod message;
mod models;
mod request;
mod response;
mod stream;

/// Current unix time in seconds, used for `created` fields when an
/// upstream does not report one.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
