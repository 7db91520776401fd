//! Process-wide cache of which model identifiers currently work.
//!
//! Each candidate moves through a small state machine:
//!
//! ```text
//! Unknown ──probe ok──▶ Available ──call/probe fails (model)──▶ Unavailable
//!    ▲                      │                                      │
//!    └──── stale, not ◀─────┘                  probe ok ───────────┘
//!          reached by a probe pass                (back to Available)
//! ```
//!
//! Reads are lock-free with respect to probing: the candidate table sits
//! behind a `parking_lot::RwLock` that is never held across an await, while a
//! separate async mutex makes probe passes single-flight.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use intelplat_core::{SharedClock, SystemClock};

use crate::service::{FailureClass, ModelService, ServiceError};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Unknown,
    Available,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCandidate {
    pub identifier: String,
    pub status: CandidateStatus,
    /// Last time a probe or real call succeeded.
    pub last_verified_at: Option<DateTime<Utc>>,
    /// Last time a probe was sent, whatever its outcome.
    #[serde(skip)]
    pub last_probed_at: Option<DateTime<Utc>>,
}

impl ModelCandidate {
    fn unknown(identifier: String) -> Self {
        Self {
            identifier,
            status: CandidateStatus::Unknown,
            last_verified_at: None,
            last_probed_at: None,
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.status == CandidateStatus::Available
            && self.last_verified_at.is_some_and(|at| now - at < ttl)
    }

    fn in_cooldown(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        self.last_probed_at.is_some_and(|at| now - at < cooldown)
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// How long an Available verdict stays trusted without re-probing.
    pub ttl: Duration,
    /// Minimum spacing between two probes of the same identifier.
    pub probe_cooldown: Duration,
    /// Upper bound on a single probe call.
    pub probe_timeout: std::time::Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
            probe_cooldown: Duration::seconds(60),
            probe_timeout: std::time::Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("no model is currently available")]
    NoModelAvailable,

    #[error("rate limited while probing: {0}")]
    RateLimited(String),
}

pub struct ModelDiscoveryCache {
    service: Arc<dyn ModelService>,
    entries: RwLock<Vec<ModelCandidate>>,
    probe_lock: tokio::sync::Mutex<()>,
    config: DiscoveryConfig,
    clock: SharedClock,
}

impl core::fmt::Debug for ModelDiscoveryCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModelDiscoveryCache")
            .field("entries", &*self.entries.read())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ModelDiscoveryCache {
    /// `preferences` is ordered best-first; duplicates are dropped.
    pub fn new(service: Arc<dyn ModelService>, preferences: Vec<String>, config: DiscoveryConfig) -> Self {
        Self::with_clock(service, preferences, config, SystemClock::shared())
    }

    pub fn with_clock(
        service: Arc<dyn ModelService>,
        preferences: Vec<String>,
        config: DiscoveryConfig,
        clock: SharedClock,
    ) -> Self {
        let mut entries: Vec<ModelCandidate> = Vec::with_capacity(preferences.len());
        for id in preferences {
            if !entries.iter().any(|e| e.identifier == id) {
                entries.push(ModelCandidate::unknown(id));
            }
        }
        Self {
            service,
            entries: RwLock::new(entries),
            probe_lock: tokio::sync::Mutex::new(()),
            config,
            clock,
        }
    }

    pub fn service(&self) -> &Arc<dyn ModelService> {
        &self.service
    }

    pub fn preferences(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.identifier.clone()).collect()
    }

    pub fn snapshot(&self) -> Vec<ModelCandidate> {
        self.entries.read().clone()
    }

    /// Highest-preference fresh Available candidate, without probing.
    pub fn current(&self) -> Option<ModelCandidate> {
        self.fresh_pick(&[])
    }

    /// Best usable candidate, probing the preference list if nothing fresh is
    /// known.
    pub async fn select(&self) -> Result<ModelCandidate, DiscoveryError> {
        self.select_excluding(&[]).await
    }

    /// Like [`select`](Self::select) but never returns (or probes) an
    /// identifier in `exclude`.
    pub async fn select_excluding(&self, exclude: &[String]) -> Result<ModelCandidate, DiscoveryError> {
        if let Some(hit) = self.fresh_pick(exclude) {
            return Ok(hit);
        }

        let _pass = self.probe_lock.lock().await;
        // Another caller may have finished a pass while we waited.
        if let Some(hit) = self.fresh_pick(exclude) {
            debug!(model = %hit.identifier, "candidate found after waiting for probe pass");
            return Ok(hit);
        }
        self.probe_pass(exclude).await
    }

    /// Record a model-specific failure seen on a real call.
    pub fn mark_unavailable(&self, identifier: &str) {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.identifier == identifier) {
            Some(entry) => {
                entry.status = CandidateStatus::Unavailable;
                warn!(model = %identifier, "model marked unavailable");
            }
            None => debug!(model = %identifier, "mark_unavailable for unknown identifier ignored"),
        }
    }

    /// Record a successful real call; refreshes the candidate's TTL.
    pub fn record_success(&self, identifier: &str) {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|e| e.identifier == identifier) {
            entry.status = CandidateStatus::Available;
            entry.last_verified_at = Some(now);
        }
    }

    fn fresh_pick(&self, exclude: &[String]) -> Option<ModelCandidate> {
        let now = self.clock.now();
        self.entries
            .read()
            .iter()
            .filter(|e| !exclude.contains(&e.identifier))
            .find(|e| e.is_fresh(now, self.config.ttl))
            .cloned()
    }

    async fn probe_pass(&self, exclude: &[String]) -> Result<ModelCandidate, DiscoveryError> {
        let plan: Vec<String> = {
            let now = self.clock.now();
            let entries = self.entries.read();
            entries
                .iter()
                .filter(|e| !exclude.contains(&e.identifier))
                .filter(|e| {
                    let cooling = e.in_cooldown(now, self.config.probe_cooldown);
                    if cooling {
                        debug!(model = %e.identifier, "probe skipped, still in cooldown");
                    }
                    !cooling
                })
                .map(|e| e.identifier.clone())
                .collect()
        };
        debug!(candidates = plan.len(), "starting probe pass");

        for identifier in plan {
            let outcome = match tokio::time::timeout(
                self.config.probe_timeout,
                self.service.probe(&identifier),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout),
            };

            match outcome {
                Ok(()) => {
                    let chosen = self.commit_success(&identifier);
                    info!(model = %identifier, "model available");
                    return Ok(chosen);
                }
                Err(err) => {
                    let class = err.class();
                    self.commit_failure(&identifier, class);
                    match class {
                        FailureClass::RateLimited => {
                            warn!(model = %identifier, error = %err, "probe pass aborted by rate limit");
                            self.demote_stale();
                            return Err(DiscoveryError::RateLimited(err.detail()));
                        }
                        FailureClass::ModelSpecific => {
                            warn!(model = %identifier, error = %err, "model failed probe");
                        }
                        FailureClass::Transient | FailureClass::Fatal => {
                            warn!(model = %identifier, error = %err, "probe inconclusive");
                        }
                    }
                }
            }
        }

        self.demote_stale();
        warn!("probe pass found no available model");
        Err(DiscoveryError::NoModelAvailable)
    }

    fn commit_success(&self, identifier: &str) -> ModelCandidate {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let mut chosen = ModelCandidate::unknown(identifier.to_string());
        for entry in entries.iter_mut() {
            if entry.identifier == identifier {
                entry.status = CandidateStatus::Available;
                entry.last_verified_at = Some(now);
                entry.last_probed_at = Some(now);
                chosen = entry.clone();
            } else if entry.status == CandidateStatus::Available && !entry.is_fresh(now, self.config.ttl) {
                entry.status = CandidateStatus::Unknown;
            }
        }
        chosen
    }

    fn commit_failure(&self, identifier: &str, class: FailureClass) {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|e| e.identifier == identifier) {
            entry.last_probed_at = Some(now);
            entry.status = match class {
                FailureClass::ModelSpecific => CandidateStatus::Unavailable,
                FailureClass::RateLimited => entry.status,
                FailureClass::Transient | FailureClass::Fatal => CandidateStatus::Unknown,
            };
        }
    }

    fn demote_stale(&self) {
        let now = self.clock.now();
        for entry in self.entries.write().iter_mut() {
            if entry.status == CandidateStatus::Available && !entry.is_fresh(now, self.config.ttl) {
                entry.status = CandidateStatus::Unknown;
            }
        }
    }
}
