//! OpenAI-compatible provider.
//!
//! Covers the OpenAI API and any service exposing the same chat
//! completions schema. The unified schema is OpenAI-shaped, so translation
//! is mostly a passthrough plus normalization of finish reasons.

use crate::http::HttpProvider;
use compact_str::CompactString;
use reqwest::Client;
pub use request::Request;

mod provider;
mod request;

/// Default base URL of the OpenAI API.
pub const BASE_URL: &str = "https://api.openai.com/v1";

/// An OpenAI-compatible provider.
#[derive(Clone)]
pub struct OpenAI {
    /// Configured provider name.
    name: CompactString,
    /// Model ids this provider serves.
    models: Vec<CompactString>,
    /// Transport targeting `{base}/chat/completions`.
    http: HttpProvider,
}

impl OpenAI {
    /// Create a provider against `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        client: Client,
        name: &str,
        key: &str,
        base_url: &str,
        models: Vec<CompactString>,
    ) -> anyhow::Result<Self> {
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        Ok(Self {
            name: name.into(),
            models,
            http: HttpProvider::bearer(client, name, key, &endpoint)?,
        })
    }

    /// The chat completions endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.http.endpoint()
    }
}
