//! Resilient entry point to the external AI service.
//!
//! Failure handling per call:
//! - model-specific errors mark the model unavailable and move on to the next
//!   selected candidate (bounded by `max_model_attempts` distinct models);
//! - transient errors retry the same model with exponential backoff (bounded
//!   by `max_transient_attempts`);
//! - rate limits surface immediately;
//! - anything else is an `UpstreamError`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use intelplat_core::Role;

use crate::context::DashboardContext;
use crate::discovery::{CandidateStatus, ModelDiscoveryCache};
use crate::result::{AiError, AiResponse, Insight};
use crate::service::{FailureClass, GenerateRequest, ModelService, ServiceError};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Distinct models tried per request before giving up.
    pub max_model_attempts: usize,
    /// Attempts on one model for transient failures (first call included).
    pub max_transient_attempts: u32,
    /// Bound on each external call.
    pub request_timeout: Duration,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_model_attempts: 3,
            max_transient_attempts: 2,
            request_timeout: Duration::from_secs(30),
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Informational state for the UI; never blocks non-AI features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GatewayStatus {
    Disabled,
    Ready { model: String },
    Degraded { reason: String },
}

#[derive(Debug)]
pub struct AiGateway {
    /// `None` when no API key is configured.
    discovery: Option<Arc<ModelDiscoveryCache>>,
    config: GatewayConfig,
}

impl AiGateway {
    pub fn new(discovery: Arc<ModelDiscoveryCache>, config: GatewayConfig) -> Self {
        Self {
            discovery: Some(discovery),
            config,
        }
    }

    /// Gateway without a key: every `ask` fails fast with `NoKeyConfigured`.
    pub fn disabled(config: GatewayConfig) -> Self {
        Self {
            discovery: None,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.discovery.is_some()
    }

    pub fn discovery(&self) -> Option<&Arc<ModelDiscoveryCache>> {
        self.discovery.as_ref()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Current state from cached knowledge only; sends nothing upstream.
    pub fn status(&self) -> GatewayStatus {
        let Some(cache) = &self.discovery else {
            return GatewayStatus::Disabled;
        };
        if let Some(candidate) = cache.current() {
            return GatewayStatus::Ready {
                model: candidate.identifier,
            };
        }
        let snapshot = cache.snapshot();
        let reason = if snapshot.is_empty() {
            "no models configured"
        } else if snapshot.iter().all(|c| c.status == CandidateStatus::Unavailable) {
            "all configured models are unavailable"
        } else {
            "no model verified recently"
        };
        GatewayStatus::Degraded {
            reason: reason.to_string(),
        }
    }

    /// Ask a free-form question, optionally with structured context.
    pub async fn ask(
        &self,
        role: Role,
        prompt: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<AiResponse, AiError> {
        let cache = self.discovery.as_ref().ok_or(AiError::NoKeyConfigured)?;
        let mut request = build_request(role, prompt)?;
        if let Some(ctx) = context.filter(|c| !c.is_null()) {
            let rendered = serde_json::to_string_pretty(ctx)
                .map_err(|e| AiError::InvalidInput(format!("context is not serializable: {e}")))?;
            request = request.with_context(rendered);
        }
        self.run(cache, &request).await
    }

    /// Ask a question about one dashboard's rows.
    pub async fn ask_with_dashboard(
        &self,
        role: Role,
        prompt: &str,
        context: &DashboardContext,
    ) -> Result<AiResponse, AiError> {
        let cache = self.discovery.as_ref().ok_or(AiError::NoKeyConfigured)?;
        let request = build_request(role, prompt)?.with_context(context.render());
        self.run(cache, &request).await
    }

    /// Analysis of a dashboard that degrades to a local summary when the
    /// service cannot answer. Rate limits and upstream failures still surface.
    pub async fn analyse(&self, role: Role, context: &DashboardContext) -> Result<Insight, AiError> {
        let prompt = format!(
            "Analyse the {} data below and recommend the next actions.",
            context.area().replace('_', " ")
        );
        match self.ask_with_dashboard(role, &prompt, context).await {
            Ok(resp) => Ok(Insight::from_model(resp)),
            Err(e) if e.is_unavailability() => {
                debug!(reason = %e, area = context.area(), "serving local summary");
                Ok(Insight::fallback(context.fallback_summary()))
            }
            Err(e) => Err(e),
        }
    }

    async fn run(&self, cache: &ModelDiscoveryCache, request: &GenerateRequest) -> Result<AiResponse, AiError> {
        let mut tried: Vec<String> = Vec::new();

        while tried.len() < self.config.max_model_attempts {
            let model = cache.select_excluding(&tried).await?.identifier;

            match self.call_with_retry(cache.service().as_ref(), &model, request).await {
                Ok(text) => {
                    cache.record_success(&model);
                    info!(model = %model, chars = text.len(), "ai request answered");
                    return Ok(AiResponse {
                        text: text.trim().to_string(),
                        model_used: model,
                    });
                }
                Err(err) => match err.class() {
                    FailureClass::ModelSpecific => {
                        warn!(model = %model, error = %err, "model rejected request; trying next");
                        cache.mark_unavailable(&model);
                        tried.push(model);
                    }
                    FailureClass::RateLimited => {
                        warn!(model = %model, "rate limited");
                        return Err(AiError::RateLimited(err.detail()));
                    }
                    FailureClass::Transient => {
                        warn!(model = %model, error = %err, "transient retries exhausted");
                        return Err(match err {
                            ServiceError::Timeout => AiError::Timeout,
                            other => AiError::UpstreamError(other.to_string()),
                        });
                    }
                    FailureClass::Fatal => {
                        warn!(model = %model, error = %err, "upstream rejected request");
                        return Err(AiError::UpstreamError(err.to_string()));
                    }
                },
            }
        }

        warn!(attempted = ?tried, "model attempts exhausted");
        Err(AiError::NoModelAvailable)
    }

    async fn call_with_retry(
        &self,
        service: &dyn ModelService,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<String, ServiceError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.config.request_timeout, service.generate(model, request)).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout),
            };

            match result {
                Err(err) if err.class() == FailureClass::Transient && attempt < self.config.max_transient_attempts => {
                    let delay = backoff(self.config.base_backoff, self.config.max_backoff, attempt);
                    warn!(model = %model, attempt, delay_ms = delay.as_millis() as u64, error = %err, "transient failure; retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

fn build_request(role: Role, prompt: &str) -> Result<GenerateRequest, AiError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AiError::InvalidInput("prompt must not be empty".to_string()));
    }
    Ok(GenerateRequest::new(prompt).with_system(persona(role)))
}

/// base * 2^(attempt-1), capped.
fn backoff(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(10);
    base.saturating_mul(factor).min(cap)
}

fn persona(role: Role) -> String {
    let focus = match role {
        Role::Admin => "security incidents, data quality and IT operations across the organisation",
        Role::Cybersecurity => "security incidents, threat patterns and incident response",
        Role::DataScience => "dataset quality, data governance and analytics",
        Role::ITOperations => "IT ticket flow, service health and operational bottlenecks",
    };
    format!(
        "You are the assistant of an internal intelligence platform. The user's role is {}. \
         Focus on {}. Answer concisely and ground every claim in the data provided.",
        role.display_name(),
        focus
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(200);
        let cap = Duration::from_secs(2);
        assert_eq!(backoff(base, cap, 1), Duration::from_millis(200));
        assert_eq!(backoff(base, cap, 2), Duration::from_millis(400));
        assert_eq!(backoff(base, cap, 4), Duration::from_millis(1600));
        assert_eq!(backoff(base, cap, 5), cap);
        assert_eq!(backoff(base, cap, 40), cap);
    }

    #[test]
    fn persona_names_the_role() {
        assert!(persona(Role::DataScience).contains("Data Science"));
    }

    #[test]
    fn disabled_gateway_reports_disabled() {
        assert_eq!(AiGateway::disabled(GatewayConfig::default()).status(), GatewayStatus::Disabled);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected() {
        let gw = AiGateway::new(
            Arc::new(ModelDiscoveryCache::new(
                Arc::new(crate::testing::ScriptedService::new()),
                vec!["m1".into()],
                Default::default(),
            )),
            GatewayConfig::default(),
        );
        assert!(matches!(gw.ask(Role::Admin, "   ", None).await, Err(AiError::InvalidInput(_))));
    }
}
