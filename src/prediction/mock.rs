use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{PredictionClient, PredictionError};
use crate::models::{EvaluationResult, PatientObservation};

enum Behavior {
    Respond(serde_json::Value),
    Fail(PredictionError),
    Hang,
}

/// Mock prediction client for testing.
///
/// Answers with a configured body or error, or never answers at all.
/// With `gated()`, each call waits for `release()` before answering.
pub struct MockPredictionClient {
    behavior: Behavior,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    last_observation: Mutex<Option<PatientObservation>>,
}

impl MockPredictionClient {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            gate: None,
            calls: AtomicUsize::new(0),
            last_observation: Mutex::new(None),
        }
    }

    pub fn new(response: serde_json::Value) -> Self {
        Self::with_behavior(Behavior::Respond(response))
    }

    pub fn failing(error: PredictionError) -> Self {
        Self::with_behavior(Behavior::Fail(error))
    }

    /// A service that accepts the request and never answers.
    pub fn hanging() -> Self {
        Self::with_behavior(Behavior::Hang)
    }

    /// Hold every answer until `release()` is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Let one held call answer.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_observation(&self) -> Option<PatientObservation> {
        self.last_observation.lock().ok()?.clone()
    }
}

#[async_trait]
impl PredictionClient for MockPredictionClient {
    async fn predict(
        &self,
        observation: &PatientObservation,
    ) -> Result<EvaluationResult, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_observation.lock() {
            *last = Some(observation.clone());
        }

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match &self.behavior {
            Behavior::Respond(body) => Ok(EvaluationResult::new(body.clone())),
            Behavior::Fail(error) => Err(error.clone()),
            Behavior::Hang => std::future::pending().await,
        }
    }

    async fn ping(&self) -> Result<(), PredictionError> {
        match &self.behavior {
            Behavior::Fail(error) => Err(error.clone()),
            _ => Ok(()),
        }
    }
}
