//! Process wiring: credential store, sessions, model discovery and gateway.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use intelplat_ai::{
    AiGateway, GeminiService, ModelDiscoveryCache, ModelService, resolve_preferences,
};
use intelplat_auth::{HashCost, InMemoryCredentialStore, SessionManager, seed_default_users};

use crate::app::AppState;
use crate::config::AppConfig;

/// Production wiring: Argon2 defaults and the Gemini client when a key is set.
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let service: Option<Arc<dyn ModelService>> = match &config.api_key {
        Some(key) => Some(Arc::new(
            GeminiService::new(key.clone(), config.request_timeout()).context("building AI client")?,
        )),
        None => None,
    };
    assemble(config, HashCost::default(), service).await
}

/// Wire state from explicit parts.
///
/// `service` is `None` when no key is configured; the gateway then reports
/// itself disabled and never calls out.
pub async fn assemble(
    config: &AppConfig,
    cost: HashCost,
    service: Option<Arc<dyn ModelService>>,
) -> anyhow::Result<AppState> {
    let store = Arc::new(InMemoryCredentialStore::new(cost).context("building credential store")?);
    if config.seed_default_users {
        seed_default_users(store.as_ref()).context("seeding default users")?;
    }
    let sessions = Arc::new(SessionManager::new(store, config.session_config()));

    let gateway = match service {
        Some(service) => {
            let preferences = resolve_preferences(config.models.as_deref(), service.as_ref()).await;
            info!(models = ?preferences, "AI gateway enabled");
            let cache = ModelDiscoveryCache::new(service, preferences, config.discovery_config());
            AiGateway::new(Arc::new(cache), config.gateway_config())
        }
        None => {
            warn!("GEMINI_API_KEY not set; AI assistant disabled");
            AiGateway::disabled(config.gateway_config())
        }
    };

    Ok(AppState::new(sessions, Arc::new(gateway)))
}
