//! Process configuration, read once at startup.
//!
//! Everything comes from environment variables. Values are resolved through a
//! lookup function so tests can supply a map instead of mutating the process
//! environment.

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

use intelplat_ai::{DiscoveryConfig, GatewayConfig, parse_preference_list};
use intelplat_auth::SessionConfig;
use intelplat_core::Secret;

pub const API_KEY: &str = "GEMINI_API_KEY";
pub const MODELS: &str = "INTELPLAT_MODELS";
pub const SESSION_TTL_SECS: &str = "INTELPLAT_SESSION_TTL_SECS";
pub const MAX_MODEL_ATTEMPTS: &str = "INTELPLAT_MAX_MODEL_ATTEMPTS";
pub const MAX_TRANSIENT_ATTEMPTS: &str = "INTELPLAT_MAX_TRANSIENT_ATTEMPTS";
pub const REQUEST_TIMEOUT_SECS: &str = "INTELPLAT_REQUEST_TIMEOUT_SECS";
pub const MODEL_TTL_SECS: &str = "INTELPLAT_MODEL_TTL_SECS";
pub const PROBE_COOLDOWN_SECS: &str = "INTELPLAT_PROBE_COOLDOWN_SECS";
pub const BIND: &str = "INTELPLAT_BIND";
pub const SEED_DEFAULT_USERS: &str = "INTELPLAT_SEED_DEFAULT_USERS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: cannot parse '{value}': {reason}")]
    Parse {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key}: must be greater than zero")]
    NotPositive { key: &'static str },

    #[error("{key}: must be at most {max}")]
    TooLarge { key: &'static str, max: u64 },
}

/// Upper bound for every duration setting, in seconds (one year).
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    /// Absent key disables the AI gateway; it is not an error.
    pub api_key: Option<Secret<String>>,
    /// Explicit model preference list; `None` means "ask the service".
    pub models: Option<Vec<String>>,
    pub session_ttl_secs: u64,
    pub max_model_attempts: u32,
    pub max_transient_attempts: u32,
    pub request_timeout_secs: u64,
    pub model_ttl_secs: u64,
    pub probe_cooldown_secs: u64,
    pub seed_default_users: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get(API_KEY).map(Secret::from);
        let models = get(MODELS)
            .map(|raw| parse_preference_list(&raw))
            .filter(|list| !list.is_empty());

        let bind = parse_or(get(BIND), BIND, SocketAddr::from(([0, 0, 0, 0], 8080)))?;
        let seed_default_users = match get(SEED_DEFAULT_USERS) {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Parse {
                key: SEED_DEFAULT_USERS,
                value: raw.clone(),
                reason: "expected true/false".to_string(),
            })?,
        };

        Ok(Self {
            bind,
            api_key,
            models,
            session_ttl_secs: duration_secs(get(SESSION_TTL_SECS), SESSION_TTL_SECS, 1800)?,
            max_model_attempts: positive(get(MAX_MODEL_ATTEMPTS), MAX_MODEL_ATTEMPTS, 3)?,
            max_transient_attempts: positive(get(MAX_TRANSIENT_ATTEMPTS), MAX_TRANSIENT_ATTEMPTS, 2)?,
            request_timeout_secs: duration_secs(get(REQUEST_TIMEOUT_SECS), REQUEST_TIMEOUT_SECS, 30)?,
            model_ttl_secs: duration_secs(get(MODEL_TTL_SECS), MODEL_TTL_SECS, 600)?,
            probe_cooldown_secs: duration_secs(get(PROBE_COOLDOWN_SECS), PROBE_COOLDOWN_SECS, 60)?,
            seed_default_users,
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            idle_timeout: delta(self.session_ttl_secs),
        }
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            ttl: delta(self.model_ttl_secs),
            probe_cooldown: delta(self.probe_cooldown_secs),
            probe_timeout: self.request_timeout(),
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            max_model_attempts: self.max_model_attempts as usize,
            max_transient_attempts: self.max_transient_attempts,
            request_timeout: self.request_timeout(),
            ..GatewayConfig::default()
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::Parse {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn positive<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value = parse_or(raw, key, default)?;
    if value == T::default() {
        return Err(ConfigError::NotPositive { key });
    }
    Ok(value)
}

fn duration_secs(raw: Option<String>, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    let value = positive(raw, key, default)?;
    if value > MAX_DURATION_SECS {
        return Err(ConfigError::TooLarge {
            key,
            max: MAX_DURATION_SECS,
        });
    }
    Ok(value)
}

/// Seconds as a signed delta, clamped to the largest representable one.
fn delta(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let cfg = load(&[]).unwrap();
        assert!(cfg.api_key.is_none());
        assert!(cfg.models.is_none());
        assert_eq!(cfg.bind.to_string(), "0.0.0.0:8080");
        assert_eq!(cfg.session_ttl_secs, 1800);
        assert_eq!(cfg.max_model_attempts, 3);
        assert_eq!(cfg.max_transient_attempts, 2);
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.model_ttl_secs, 600);
        assert_eq!(cfg.probe_cooldown_secs, 60);
        assert!(cfg.seed_default_users);
    }

    #[test]
    fn overrides_are_read() {
        let cfg = load(&[
            (API_KEY, " AIza-test "),
            (MODELS, "gemini-2.0-flash, models/gemini-pro"),
            (SESSION_TTL_SECS, "60"),
            (BIND, "127.0.0.1:9000"),
            (SEED_DEFAULT_USERS, "off"),
        ])
        .unwrap();
        assert_eq!(cfg.api_key.as_ref().map(|k| k.expose().as_str()), Some("AIza-test"));
        assert_eq!(
            cfg.models,
            Some(vec!["gemini-2.0-flash".to_string(), "gemini-pro".to_string()])
        );
        assert_eq!(cfg.session_config().idle_timeout, chrono::Duration::seconds(60));
        assert_eq!(cfg.bind.port(), 9000);
        assert!(!cfg.seed_default_users);
    }

    #[test]
    fn blank_key_means_no_key() {
        assert!(load(&[(API_KEY, "   ")]).unwrap().api_key.is_none());
    }

    #[test]
    fn invalid_numbers_are_errors() {
        assert!(matches!(
            load(&[(REQUEST_TIMEOUT_SECS, "soon")]),
            Err(ConfigError::Parse { key: REQUEST_TIMEOUT_SECS, .. })
        ));
        assert_eq!(
            load(&[(MAX_MODEL_ATTEMPTS, "0")]).unwrap_err(),
            ConfigError::NotPositive { key: MAX_MODEL_ATTEMPTS }
        );
        assert!(load(&[(SEED_DEFAULT_USERS, "maybe")]).is_err());
    }

    #[test]
    fn oversized_durations_are_errors() {
        for key in [SESSION_TTL_SECS, REQUEST_TIMEOUT_SECS, MODEL_TTL_SECS, PROBE_COOLDOWN_SECS] {
            assert_eq!(
                load(&[(key, "9223372036854775807")]).unwrap_err(),
                ConfigError::TooLarge { key, max: MAX_DURATION_SECS }
            );
        }
        assert!(matches!(
            load(&[(SESSION_TTL_SECS, "18446744073709551616")]),
            Err(ConfigError::Parse { key: SESSION_TTL_SECS, .. })
        ));

        let cfg = load(&[(SESSION_TTL_SECS, MAX_DURATION_SECS.to_string().as_str())]).unwrap();
        assert_eq!(cfg.session_config().idle_timeout, chrono::Duration::days(365));
    }

    #[test]
    fn out_of_range_fields_clamp_when_built_by_hand() {
        let cfg = AppConfig {
            session_ttl_secs: u64::MAX,
            model_ttl_secs: i64::MAX as u64,
            ..load(&[]).unwrap()
        };
        assert_eq!(cfg.session_config().idle_timeout, chrono::Duration::MAX);
        assert_eq!(cfg.discovery_config().ttl, chrono::Duration::MAX);
    }

    #[test]
    fn debug_never_shows_the_key() {
        let cfg = load(&[(API_KEY, "AIza-secret")]).unwrap();
        assert!(!format!("{cfg:?}").contains("AIza-secret"));
    }
}
