//! Gateway error taxonomy.
//!
//! Every failure a caller can observe maps onto one of these kinds. Only
//! [`Error::DuplicateModel`] is fatal, and only at startup.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Result alias used across the gateway.
pub type Result<T> = std::result::Result<T, Error>;

/// A gateway error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller sent something that is not a valid unified request.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// No adapter claims the requested model id.
    #[error("model '{0}' is not served by any provider")]
    UnknownModel(CompactString),

    /// Two registrations claim the same model id.
    #[error("model '{model}' is claimed by both '{first}' and '{second}'")]
    DuplicateModel {
        /// The contested model id.
        model: CompactString,
        /// Provider that registered the id first.
        first: CompactString,
        /// Provider that tried to register it again.
        second: CompactString,
    },

    /// Transport failure, timeout or 5xx talking to a provider.
    #[error("provider '{provider}' is unavailable: {reason}")]
    UpstreamUnavailable {
        /// Configured provider name.
        provider: CompactString,
        /// Internal cause. Logged, never sent to the caller.
        reason: String,
    },

    /// The provider refused the request.
    #[error("provider '{provider}' rejected the request: {message}")]
    UpstreamRejected {
        /// Configured provider name.
        provider: CompactString,
        /// Upstream HTTP status, when the refusal came with one.
        status: Option<u16>,
        /// Upstream message, relayed verbatim.
        message: String,
    },

    /// An adapter could not translate an upstream chunk mid-stream.
    #[error("stream from provider '{provider}' failed: {reason}")]
    StreamTranslationFailure {
        /// Configured provider name.
        provider: CompactString,
        /// What could not be translated.
        reason: String,
    },
}

impl Error {
    /// Shorthand for [`Error::MalformedRequest`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest(reason.into())
    }

    /// Shorthand for [`Error::UpstreamUnavailable`].
    pub fn unavailable(provider: &str, reason: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`Error::StreamTranslationFailure`].
    pub fn translation(provider: &str, reason: impl ToString) -> Self {
        Self::StreamTranslationFailure {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// The OpenAI-style `error.type` string for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "invalid_request_error",
            Self::UnknownModel(_) => "model_not_found",
            Self::DuplicateModel { .. } => "configuration_error",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::UpstreamRejected { .. } => "upstream_rejected",
            Self::StreamTranslationFailure { .. } => "stream_error",
        }
    }

    /// HTTP status reported to the caller.
    pub fn status(&self) -> u16 {
        match self {
            Self::MalformedRequest(_) => 400,
            Self::UnknownModel(_) => 404,
            Self::UpstreamUnavailable { .. } => 503,
            Self::UpstreamRejected {
                status: Some(status),
                ..
            } if (400..500).contains(status) => *status,
            Self::UpstreamRejected { .. } | Self::StreamTranslationFailure { .. } => 502,
            Self::DuplicateModel { .. } => 500,
        }
    }

    /// Provider the error is attributed to, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::UpstreamUnavailable { provider, .. }
            | Self::UpstreamRejected { provider, .. }
            | Self::StreamTranslationFailure { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    /// Message safe to hand to the caller.
    ///
    /// Upstream transport causes stay in the logs; everything else is
    /// reported as displayed.
    pub fn public_message(&self) -> String {
        match self {
            Self::UpstreamUnavailable { provider, .. } => {
                format!("provider '{provider}' is unavailable")
            }
            Self::StreamTranslationFailure { provider, .. } => {
                format!("stream from provider '{provider}' terminated abnormally")
            }
            other => other.to_string(),
        }
    }

    /// Structured body sent to the caller.
    pub fn body(&self) -> ErrorBody {
        let code = match self {
            Self::UpstreamRejected { status, .. } => *status,
            _ => None,
        };
        ErrorBody {
            error: ErrorDetail {
                message: self.public_message(),
                kind: self.kind().into(),
                provider: self.provider().map(CompactString::from),
                code,
            },
        }
    }
}

/// Caller-visible error envelope: `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The error detail.
    pub error: ErrorDetail,
}

/// Fields of a caller-visible error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable message.
    pub message: String,
    /// Error kind, see [`Error::kind`].
    #[serde(rename = "type")]
    pub kind: CompactString,
    /// Provider attribution for upstream failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<CompactString>,
    /// Upstream status code for rejected requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}
