//! HTTP client for the Gemini `generateContent` REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use intelplat_core::Secret;

use crate::service::{GenerateRequest, ModelInfo, ModelService, ServiceError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// `ModelService` backed by the Gemini REST API.
///
/// The key travels in a header, never in the URL, so it cannot leak through
/// request logs.
pub struct GeminiService {
    client: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
}

impl GeminiService {
    pub fn new(api_key: Secret<String>, request_timeout: Duration) -> Result<Self, ServiceError> {
        Self::with_base_url(api_key, request_timeout, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: Secret<String>,
        request_timeout: Duration,
        base_url: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn error_from_response(model: &str, resp: reqwest::Response) -> ServiceError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        classify_status(model, status, &message)
    }
}

impl core::fmt::Debug for GeminiService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GeminiService")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .finish()
    }
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout
    } else {
        ServiceError::Transport(e.to_string())
    }
}

/// Map an HTTP failure to a `ServiceError`.
pub fn classify_status(model: &str, status: StatusCode, message: &str) -> ServiceError {
    let lower = message.to_ascii_lowercase();
    match status.as_u16() {
        404 => ServiceError::ModelNotFound(model.to_string()),
        410 => ServiceError::ModelDeprecated(model.to_string()),
        403 => ServiceError::PermissionDenied(model.to_string()),
        401 => ServiceError::Unauthenticated,
        429 => ServiceError::RateLimited(message.to_string()),
        400 if lower.contains("api key") => ServiceError::Unauthenticated,
        400 if lower.contains("deprecated") => ServiceError::ModelDeprecated(model.to_string()),
        400 if lower.contains("not supported") || lower.contains("not found") => {
            ServiceError::ModelUnsupported {
                model: model.to_string(),
                message: message.to_string(),
            }
        }
        400 => ServiceError::BadRequest(message.to_string()),
        code @ (408 | 500..=599) => ServiceError::Unavailable {
            status: code,
            message: message.to_string(),
        },
        code => ServiceError::BadRequest(format!("unexpected status {code}: {message}")),
    }
}

#[async_trait]
impl ModelService for GeminiService {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ServiceError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .get(format!("{}/models", self.base_url))
                .header(API_KEY_HEADER, self.api_key.expose())
                .query(&[("pageSize", "1000")]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }

            let resp = req.send().await.map_err(transport_error)?;
            if !resp.status().is_success() {
                return Err(Self::error_from_response("*", resp).await);
            }
            let page: ListModelsResponse = resp
                .json()
                .await
                .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

            models.extend(page.models.into_iter().map(|m| ModelInfo {
                name: m.name,
                supported_methods: m.supported_generation_methods,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = models.len(), "listed models");
        Ok(models)
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<String, ServiceError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.user_text()),
                }],
            }],
            system_instruction: request.system.as_ref().map(|s| Content {
                role: None,
                parts: vec![Part {
                    text: Some(s.clone()),
                }],
            }),
        };

        let resp = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(model, resp).await);
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
        extract_text(parsed)
    }
}

fn extract_text(resp: GenerateContentResponse) -> Result<String, ServiceError> {
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::MalformedResponse("response has no candidates".to_string()))?;
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(ServiceError::MalformedResponse(format!(
            "candidate has no text (finish reason: {reason})"
        )));
    }
    Ok(text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<WireModel>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}
