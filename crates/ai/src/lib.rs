//! `intelplat-ai`
//!
//! **Responsibility:** resilient access to the external generative-AI service.
//!
//! - `ModelService` is the seam to the provider (`GeminiService` in production).
//! - `ModelDiscoveryCache` tracks which model identifiers currently work.
//! - `AiGateway` turns a role and a prompt into an answer, or a typed failure.
//!
//! Nothing here knows about sessions; callers authorize before asking.

pub mod catalog;
pub mod context;
pub mod discovery;
pub mod gateway;
pub mod gemini;
pub mod result;
pub mod service;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{FALLBACK_MODELS, parse_preference_list, resolve_preferences};
pub use context::{Dataset, DashboardContext, Incident, Ticket, suggested_questions};
pub use discovery::{CandidateStatus, DiscoveryConfig, DiscoveryError, ModelCandidate, ModelDiscoveryCache};
pub use gateway::{AiGateway, GatewayConfig, GatewayStatus};
pub use gemini::GeminiService;
pub use result::{AiError, AiResponse, Insight, InsightSource};
pub use service::{FailureClass, GenerateRequest, ModelInfo, ModelService, ServiceError};
