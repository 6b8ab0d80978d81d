pub mod client;
pub mod mock;

pub use client::HttpPredictionClient;
pub use mock::MockPredictionClient;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{EvaluationResult, PatientObservation};

/// Failure of one exchange with the prediction service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredictionError {
    #[error("Prediction service returned error (status {status}): {body}")]
    ServerRejected { status: u16, body: String },

    #[error("Prediction service unreachable: {0}")]
    Unreachable(String),

    #[error("Request could not be built: {0}")]
    RequestMalformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionErrorKind {
    ServerRejected,
    Unreachable,
    RequestMalformed,
}

impl PredictionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServerRejected => "server_rejected",
            Self::Unreachable => "unreachable",
            Self::RequestMalformed => "request_malformed",
        }
    }
}

impl PredictionError {
    pub fn kind(&self) -> PredictionErrorKind {
        match self {
            Self::ServerRejected { .. } => PredictionErrorKind::ServerRejected,
            Self::Unreachable(_) => PredictionErrorKind::Unreachable,
            Self::RequestMalformed(_) => PredictionErrorKind::RequestMalformed,
        }
    }

    /// HTTP status, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// One request/response exchange with the prediction service.
#[async_trait]
pub trait PredictionClient: Send + Sync {
    /// Send one observation, return the service's body verbatim.
    async fn predict(
        &self,
        observation: &PatientObservation,
    ) -> Result<EvaluationResult, PredictionError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), PredictionError>;
}
