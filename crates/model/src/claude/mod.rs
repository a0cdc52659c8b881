//! Claude (Anthropic) provider.
//!
//! Implements the Anthropic Messages API, which differs from the unified
//! schema in message structure (system prompt is a top-level field,
//! `max_tokens` is required) and in its typed streaming events.

use crate::http::HttpProvider;
use compact_str::CompactString;
use reqwest::Client;
pub use request::Request;
pub use stream::{Event, Translator};

mod provider;
mod request;
mod stream;

/// Default base URL of the Anthropic API.
pub const BASE_URL: &str = "https://api.anthropic.com/v1";

/// The Anthropic API version header value.
pub const API_VERSION: &str = "2023-06-01";

/// Token limit sent when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// The Claude provider.
#[derive(Clone)]
pub struct Claude {
    /// Configured provider name.
    name: CompactString,
    /// Model ids this provider serves.
    models: Vec<CompactString>,
    /// Transport targeting `{base}/messages` (x-api-key, anthropic-version).
    http: HttpProvider,
}

impl Claude {
    /// Create a provider against `base_url` (e.g. `https://api.anthropic.com/v1`).
    pub fn new(
        client: Client,
        name: &str,
        key: &str,
        base_url: &str,
        models: Vec<CompactString>,
    ) -> anyhow::Result<Self> {
        let endpoint = format!("{}/messages", base_url.trim_end_matches('/'));
        let http = HttpProvider::custom_headers(
            client,
            name,
            &[("x-api-key", key), ("anthropic-version", API_VERSION)],
            &endpoint,
        )?;
        Ok(Self {
            name: name.into(),
            models,
            http,
        })
    }

    /// The Messages API endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.http.endpoint()
    }
}
