//! Ollama provider, speaking the native `/api/chat` API.
//!
//! No authentication; responses stream as newline-delimited JSON.

use crate::http::HttpProvider;
use compact_str::CompactString;
use reqwest::Client;
pub use request::Request;

mod provider;
mod request;

/// Default base URL of a local Ollama instance.
pub const BASE_URL: &str = "http://localhost:11434";

/// The Ollama provider.
#[derive(Clone)]
pub struct Ollama {
    /// Configured provider name.
    name: CompactString,
    /// Model ids this provider serves.
    models: Vec<CompactString>,
    /// Transport targeting `{base}/api/chat`.
    http: HttpProvider,
}

impl Ollama {
    /// Create a provider against `base_url` (e.g. `http://localhost:11434`).
    pub fn new(client: Client, name: &str, base_url: &str, models: Vec<CompactString>) -> Self {
        let endpoint = format!("{}/api/chat", base_url.trim_end_matches('/'));
        Self {
            name: name.into(),
            models,
            http: HttpProvider::no_auth(client, name, &endpoint),
        }
    }

    /// The chat endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.http.endpoint()
    }
}
