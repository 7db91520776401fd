//! Building the model preference list.
//!
//! An explicit list from configuration wins. Otherwise the service's own
//! listing is filtered down to chat-capable models, and if that yields nothing
//! a built-in fallback list is used.

use tracing::{info, warn};

use crate::service::{ModelInfo, ModelService};

/// Used when neither configuration nor the listing provides candidates.
pub const FALLBACK_MODELS: [&str; 3] = ["gemini-2.0-flash-exp", "gemini-2.0-flash", "gemini-pro"];

const GENERATE_METHOD: &str = "generateContent";

/// Whether a listed model is a usable chat candidate.
///
/// Keeps Gemini models that support `generateContent`; drops computer-use
/// models, the 2.5 family and experimental builds outside the 2.0 family.
pub fn is_chat_candidate(model: &ModelInfo) -> bool {
    let name = normalize_identifier(&model.name).to_ascii_lowercase();
    if !name.contains("gemini") {
        return false;
    }
    if name.contains("computer") || name.contains("2.5") {
        return false;
    }
    if name.contains("exp") && !name.contains("2.0") {
        return false;
    }
    model.supported_methods.iter().any(|m| m == GENERATE_METHOD)
}

/// Strip the `models/` resource prefix.
pub fn normalize_identifier(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name).trim()
}

/// Filter a listing into an ordered, de-duplicated preference list.
pub fn preferences_from_listing(models: &[ModelInfo]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for model in models.iter().filter(|m| is_chat_candidate(m)) {
        let id = normalize_identifier(&model.name).to_string();
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Parse a comma-separated override (`"m1, m2"`).
pub fn parse_preference_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in raw.split(',').map(normalize_identifier).filter(|s| !s.is_empty()) {
        if !out.iter().any(|existing| existing == id) {
            out.push(id.to_string());
        }
    }
    out
}

/// Resolve the preference list for this process.
pub async fn resolve_preferences(
    configured: Option<&[String]>,
    service: &dyn ModelService,
) -> Vec<String> {
    if let Some(list) = configured.filter(|l| !l.is_empty()) {
        info!(models = ?list, "using configured model preferences");
        return list.to_vec();
    }

    match service.list_models().await {
        Ok(models) => {
            let prefs = preferences_from_listing(&models);
            if !prefs.is_empty() {
                info!(listed = models.len(), models = ?prefs, "model preferences from listing");
                return prefs;
            }
            warn!(listed = models.len(), "listing produced no usable models; using fallback list");
        }
        Err(e) => warn!(error = %e, "model listing failed; using fallback list"),
    }
    FALLBACK_MODELS.iter().map(|s| s.to_string()).collect()
}
