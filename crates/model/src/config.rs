//! Provider configuration.
//!
//! One `[[providers]]` entry of the gateway config: which API family to
//! speak, where to reach it, the credential, and the model ids it serves.

use anyhow::{Result, bail};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream API family of a provider entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI chat completions API, or anything compatible with it.
    #[serde(rename = "openai")]
    OpenAI,
    /// Anthropic Messages API.
    #[serde(alias = "claude")]
    Anthropic,
    /// Ollama native chat API.
    Ollama,
}

impl ProviderKind {
    /// Config spelling of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    /// Base URL used when the entry does not set one.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => crate::openai::BASE_URL,
            Self::Anthropic => crate::claude::BASE_URL,
            Self::Ollama => crate::ollama::BASE_URL,
        }
    }

    /// Whether the upstream expects an API key.
    pub fn requires_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured upstream provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique name, reported as `owned_by` and in logs.
    pub name: CompactString,

    /// API family.
    #[serde(rename = "type")]
    pub kind: ProviderKind,

    /// Base URL override. The per-kind default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key, after `${ENV}` expansion. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub api_key: String,

    /// Model ids served by this provider, in listing order.
    #[serde(default)]
    pub models: Vec<CompactString>,

    /// Lower values are listed first.
    #[serde(default)]
    pub priority: i32,
}

impl ProviderConfig {
    /// Create a config with the default base URL and priority 0.
    pub fn new(
        name: impl Into<CompactString>,
        kind: ProviderKind,
        models: impl IntoIterator<Item = impl Into<CompactString>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            base_url: None,
            api_key: String::new(),
            models: models.into_iter().map(Into::into).collect(),
            priority: 0,
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Effective base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(self.kind.default_base_url())
            .trim_end_matches('/')
    }

    /// Check the entry on its own. Cross-entry checks (unique names,
    /// unique model ids) happen when the registry is built.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("provider name must not be empty");
        }
        if self.models.is_empty() {
            bail!("provider '{}' must list at least one model", self.name);
        }
        if let Some(model) = self.models.iter().find(|m| m.trim().is_empty()) {
            bail!(
                "provider '{}' lists an empty model id '{model}'",
                self.name
            );
        }
        let base = self.base_url();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            bail!(
                "provider '{}' has invalid base_url '{base}': expected http:// or https://",
                self.name
            );
        }
        Ok(())
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() { "" } else { "***" };
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("api_key", &key)
            .field("models", &self.models)
            .field("priority", &self.priority)
            .finish()
    }
}
