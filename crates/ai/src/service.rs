//! Boundary to the external generative-AI service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of the service's model listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub supported_methods: Vec<String>,
}

/// Provider-neutral generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// System instruction (persona, constraints).
    pub system: Option<String>,
    pub prompt: String,
    /// Supporting data appended after the prompt.
    pub context: Option<String>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            context: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Minimal capability check used when probing a model.
    pub fn probe() -> Self {
        Self::new("Hi")
    }

    /// Prompt and context as one user message.
    pub fn user_text(&self) -> String {
        match &self.context {
            Some(ctx) if !ctx.trim().is_empty() => format!("{}\n\n{}", self.prompt, ctx),
            _ => self.prompt.clone(),
        }
    }
}

/// Failure reported by the external service (or the transport to it).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("model '{0}' not found")]
    ModelNotFound(String),

    #[error("model '{0}' is deprecated")]
    ModelDeprecated(String),

    #[error("model '{model}' does not support this call: {message}")]
    ModelUnsupported { model: String, message: String },

    #[error("permission denied for model '{0}'")]
    PermissionDenied(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("service unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("api key rejected")]
    Unauthenticated,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// How a failure should be handled by the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FailureClass {
    /// The model, not the request, is the problem: try another model.
    ModelSpecific,
    /// Network or server hiccup: retry the same model.
    Transient,
    /// Quota exhausted: stop immediately.
    RateLimited,
    /// Retrying will not help.
    Fatal,
}

impl ServiceError {
    /// Provider message without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            ServiceError::RateLimited(msg)
            | ServiceError::Transport(msg)
            | ServiceError::BadRequest(msg)
            | ServiceError::MalformedResponse(msg) => msg.clone(),
            ServiceError::ModelUnsupported { message, .. } | ServiceError::Unavailable { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            ServiceError::ModelNotFound(_)
            | ServiceError::ModelDeprecated(_)
            | ServiceError::ModelUnsupported { .. }
            | ServiceError::PermissionDenied(_) => FailureClass::ModelSpecific,
            ServiceError::Timeout
            | ServiceError::Transport(_)
            | ServiceError::Unavailable { .. } => FailureClass::Transient,
            ServiceError::RateLimited(_) => FailureClass::RateLimited,
            ServiceError::Unauthenticated
            | ServiceError::BadRequest(_)
            | ServiceError::MalformedResponse(_) => FailureClass::Fatal,
        }
    }
}

/// External generative-AI service.
///
/// Implementations must not hold locks across awaits; the gateway bounds each
/// call with its own timeout and may drop the future at any point.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Models the service currently advertises.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ServiceError>;

    /// Generate text with `model`.
    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String, ServiceError>;

    /// Minimal capability check for `model`.
    async fn probe(&self, model: &str) -> Result<(), ServiceError> {
        self.generate(model, &GenerateRequest::probe()).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        let model_specific = [
            ServiceError::ModelNotFound("m".into()),
            ServiceError::ModelDeprecated("m".into()),
            ServiceError::PermissionDenied("m".into()),
            ServiceError::ModelUnsupported { model: "m".into(), message: "x".into() },
        ];
        for e in model_specific {
            assert_eq!(e.class(), FailureClass::ModelSpecific, "{e}");
        }
        assert_eq!(ServiceError::Timeout.class(), FailureClass::Transient);
        assert_eq!(
            ServiceError::Unavailable { status: 503, message: String::new() }.class(),
            FailureClass::Transient
        );
        assert_eq!(ServiceError::RateLimited("q".into()).class(), FailureClass::RateLimited);
        assert_eq!(ServiceError::Unauthenticated.class(), FailureClass::Fatal);
    }

    #[test]
    fn user_text_appends_context() {
        let req = GenerateRequest::new("What needs attention?").with_context("Open tickets: 3");
        assert_eq!(req.user_text(), "What needs attention?\n\nOpen tickets: 3");
        assert_eq!(GenerateRequest::new("plain").user_text(), "plain");
    }
}
