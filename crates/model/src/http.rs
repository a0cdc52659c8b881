//! Shared HTTP transport for every provider adapter.
//!
//! `HttpProvider` wraps a `reqwest::Client` with pre-configured headers and
//! the endpoint URL, and classifies upstream failures into the gateway
//! error taxonomy: transport errors and 5xx become `UpstreamUnavailable`,
//! anything else non-2xx becomes `UpstreamRejected` with the upstream's
//! own message.

use anyhow::Result;
use compact_str::CompactString;
use mcore::Error;
use reqwest::{
    Client, Method, RequestBuilder, StatusCode,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};

/// Shared HTTP transport.
#[derive(Clone)]
pub struct HttpProvider {
    client: Client,
    headers: HeaderMap,
    endpoint: String,
    name: CompactString,
}

impl HttpProvider {
    /// Create a transport with Bearer token authentication.
    pub fn bearer(client: Client, name: &str, key: &str, endpoint: &str) -> Result<Self> {
        let mut headers = json_headers();
        headers.insert(header::AUTHORIZATION, format!("Bearer {key}").parse()?);
        Ok(Self::with_headers(client, name, headers, endpoint))
    }

    /// Create a transport without authentication.
    pub fn no_auth(client: Client, name: &str, endpoint: &str) -> Self {
        Self::with_headers(client, name, json_headers(), endpoint)
    }

    /// Create a transport with custom authentication headers, e.g.
    /// `x-api-key` for Anthropic.
    pub fn custom_headers(
        client: Client,
        name: &str,
        extra: &[(&str, &str)],
        endpoint: &str,
    ) -> Result<Self> {
        let mut headers = json_headers();
        for (key, value) in extra {
            headers.insert(key.parse::<HeaderName>()?, value.parse::<HeaderValue>()?);
        }
        Ok(Self::with_headers(client, name, headers, endpoint))
    }

    fn with_headers(client: Client, name: &str, headers: HeaderMap, endpoint: &str) -> Self {
        Self {
            client,
            headers,
            endpoint: endpoint.to_owned(),
            name: name.into(),
        }
    }

    /// Build a POST of `body` to the endpoint. The builder owns everything
    /// it needs, so it can be moved into a stream.
    pub fn request(&self, body: &impl Serialize) -> RequestBuilder {
        if let Ok(json) = serde_json::to_string(body) {
            tracing::trace!("request to {}: {json}", self.endpoint);
        }
        self.client
            .request(Method::POST, &self.endpoint)
            .headers(self.headers.clone())
            .json(body)
    }

    /// Send a non-streaming request and decode the JSON response.
    pub async fn send<T: DeserializeOwned>(&self, body: &impl Serialize) -> mcore::Result<T> {
        let response = open(&self.name, self.request(body)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::unavailable(&self.name, e))?;
        tracing::trace!("response: {}", String::from_utf8_lossy(&bytes));
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::unavailable(&self.name, format!("invalid response body: {e}")))
    }

    /// Get the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Send a prepared request and check its status.
///
/// Returns the response untouched on 2xx, so streaming callers can read
/// the body incrementally.
pub async fn open(provider: &str, request: RequestBuilder) -> mcore::Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::unavailable(provider, e))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    tracing::debug!("provider '{provider}' returned {status}: {text}");
    Err(classify(provider, status, &text))
}

/// Map a non-2xx upstream status and body onto the error taxonomy.
pub fn classify(provider: &str, status: StatusCode, body: &str) -> Error {
    let message = upstream_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("upstream error")
            .to_owned()
    });
    if status.is_server_error() {
        Error::unavailable(provider, format!("status {status}: {message}"))
    } else {
        Error::UpstreamRejected {
            provider: provider.into(),
            status: Some(status.as_u16()),
            message,
        }
    }
}

/// Pull the human-readable message out of an upstream error body.
///
/// Understands `{"error": {"message": ..}}` (OpenAI, Anthropic),
/// `{"error": ".."}` (Ollama) and `{"message": ..}`; falls back to the
/// raw text.
fn upstream_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.to_owned());
    };
    let found = value
        .pointer("/error/message")
        .or_else(|| value.get("error").filter(|e| e.is_string()))
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str());
    Some(found.map(str::to_owned).unwrap_or_else(|| trimmed.to_owned()))
}
