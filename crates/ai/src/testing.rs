//! Scripted in-process `ModelService` for tests.
//!
//! Built only under `cfg(test)` or the `testing` feature.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::service::{GenerateRequest, ModelInfo, ModelService, ServiceError};

/// `ModelService` whose answers are set up ahead of time, per model.
///
/// Queued outcomes (`push`) are consumed first, then the model's standing
/// outcome (`respond`). A model with neither answers `ModelNotFound`.
#[derive(Debug)]
pub struct ScriptedService {
    listing: Mutex<Result<Vec<ModelInfo>, ServiceError>>,
    queued: Mutex<HashMap<String, VecDeque<Result<String, ServiceError>>>>,
    standing: Mutex<HashMap<String, Result<String, ServiceError>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self {
            listing: Mutex::new(Ok(Vec::new())),
            queued: Mutex::new(HashMap::new()),
            standing: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before answering (uses tokio time).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_listing(self, listing: Result<Vec<ModelInfo>, ServiceError>) -> Self {
        *self.listing.lock() = listing;
        self
    }

    /// Standing outcome for every call to `model`.
    pub fn respond(&self, model: &str, outcome: Result<String, ServiceError>) -> &Self {
        self.standing.lock().insert(model.to_string(), outcome);
        self
    }

    /// One-shot outcome for the next call to `model`.
    pub fn push(&self, model: &str, outcome: Result<String, ServiceError>) -> &Self {
        self.queued
            .lock()
            .entry(model.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Models called so far, in order (probes included).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, model: &str) -> usize {
        self.calls.lock().iter().filter(|m| *m == model).count()
    }

    fn next_outcome(&self, model: &str) -> Result<String, ServiceError> {
        self.calls.lock().push(model.to_string());
        if let Some(outcome) = self.queued.lock().get_mut(model).and_then(VecDeque::pop_front) {
            return outcome;
        }
        self.standing
            .lock()
            .get(model)
            .cloned()
            .unwrap_or_else(|| Err(ServiceError::ModelNotFound(model.to_string())))
    }
}

#[async_trait]
impl ModelService for ScriptedService {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ServiceError> {
        self.listing.lock().clone()
    }

    async fn generate(&self, model: &str, _request: &GenerateRequest) -> Result<String, ServiceError> {
        let outcome = self.next_outcome(model);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
