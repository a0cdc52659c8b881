//! Provider implementation.
//!
//! Unified `Provider` enum with enum dispatch over the concrete adapters.
//! `build_provider()` matches on the configured `ProviderKind`.

use crate::{
    claude::Claude,
    config::{ProviderConfig, ProviderKind},
    ollama::Ollama,
    openai::OpenAI,
};
use anyhow::Result;
use compact_str::CompactString;
use mcore::{Adapter, ChatRequest, ChunkStream, Response};

/// Unified provider enum.
///
/// The registry is monomorphized on `Provider`; each variant owns its own
/// HTTP transport and credentials.
#[derive(Clone)]
pub enum Provider {
    /// OpenAI-compatible chat completions API.
    OpenAI(OpenAI),
    /// Anthropic Messages API.
    Claude(Claude),
    /// Ollama native chat API.
    Ollama(Ollama),
}

impl Provider {
    /// API family of this provider.
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAI(_) => ProviderKind::OpenAI,
            Self::Claude(_) => ProviderKind::Anthropic,
            Self::Ollama(_) => ProviderKind::Ollama,
        }
    }

    /// Upstream endpoint this provider posts to.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::OpenAI(p) => p.endpoint(),
            Self::Claude(p) => p.endpoint(),
            Self::Ollama(p) => p.endpoint(),
        }
    }
}

/// Construct a `Provider` from config and a shared HTTP client.
pub fn build_provider(config: &ProviderConfig, client: reqwest::Client) -> Result<Provider> {
    config.validate()?;
    let name = config.name.as_str();
    let base_url = config.base_url();
    let models = config.models.clone();
    let key = config.api_key.as_str();

    let provider = match config.kind {
        ProviderKind::OpenAI => Provider::OpenAI(OpenAI::new(client, name, key, base_url, models)?),
        ProviderKind::Anthropic => {
            Provider::Claude(Claude::new(client, name, key, base_url, models)?)
        }
        ProviderKind::Ollama => Provider::Ollama(Ollama::new(client, name, base_url, models)),
    };
    Ok(provider)
}

impl Adapter for Provider {
    fn name(&self) -> &str {
        match self {
            Self::OpenAI(p) => p.name(),
            Self::Claude(p) => p.name(),
            Self::Ollama(p) => p.name(),
        }
    }

    fn models(&self) -> &[CompactString] {
        match self {
            Self::OpenAI(p) => p.models(),
            Self::Claude(p) => p.models(),
            Self::Ollama(p) => p.models(),
        }
    }

    async fn send(&self, request: &ChatRequest) -> mcore::Result<Response> {
        match self {
            Self::OpenAI(p) => p.send(request).await,
            Self::Claude(p) => p.send(request).await,
            Self::Ollama(p) => p.send(request).await,
        }
    }

    fn stream(&self, request: &ChatRequest) -> ChunkStream {
        match self {
            Self::OpenAI(p) => p.stream(request),
            Self::Claude(p) => p.stream(request),
            Self::Ollama(p) => p.stream(request),
        }
    }
}
