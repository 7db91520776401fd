use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discovery::DiscoveryError;

/// Answer produced by the external service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResponse {
    pub text: String,
    /// Identifier of the model that produced `text`.
    pub model_used: String,
}

/// Where an [`Insight`] came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSource {
    Model,
    /// Computed locally because the service could not answer.
    Fallback,
}

/// Dashboard analysis; always has text, even when the service is unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub text: String,
    pub source: InsightSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

impl Insight {
    pub fn from_model(resp: AiResponse) -> Self {
        Self {
            text: resp.text,
            source: InsightSource::Model,
            model_used: Some(resp.model_used),
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: InsightSource::Fallback,
            model_used: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("no API key configured")]
    NoKeyConfigured,

    #[error("no model is currently available")]
    NoModelAvailable,

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AiError {
    /// Stable code for callers that serialize errors.
    pub fn code(&self) -> &'static str {
        match self {
            AiError::NoKeyConfigured => "no_key_configured",
            AiError::NoModelAvailable => "no_model_available",
            AiError::UpstreamError(_) => "upstream_error",
            AiError::RateLimited(_) => "rate_limited",
            AiError::Timeout => "timeout",
            AiError::InvalidInput(_) => "invalid_input",
        }
    }

    /// Whether the caller should show local data instead of an error.
    pub fn is_unavailability(&self) -> bool {
        matches!(self, AiError::NoKeyConfigured | AiError::NoModelAvailable)
    }
}

impl From<DiscoveryError> for AiError {
    fn from(e: DiscoveryError) -> Self {
        match e {
            DiscoveryError::NoModelAvailable => AiError::NoModelAvailable,
            DiscoveryError::RateLimited(msg) => AiError::RateLimited(msg),
        }
    }
}
