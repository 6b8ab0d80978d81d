use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::{PredictionClient, PredictionError};
use crate::config::PredictionConfig;
use crate::models::{EvaluationResult, PatientObservation};

/// HTTP client for the external risk prediction service.
pub struct HttpPredictionClient {
    base_url: String,
    endpoint: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpPredictionClient {
    /// Create a client posting to `{base_url}{predict_path}`.
    pub fn new(
        base_url: &str,
        predict_path: &str,
        timeout_secs: u64,
        connect_timeout_secs: u64,
    ) -> Result<Self, PredictionError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let endpoint = format!("{base_url}{predict_path}");
        reqwest::Url::parse(&endpoint).map_err(|e| {
            PredictionError::RequestMalformed(format!("invalid endpoint {endpoint}: {e}"))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()
            .map_err(|e| PredictionError::RequestMalformed(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            endpoint,
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &PredictionConfig) -> Result<Self, PredictionError> {
        Self::new(
            &config.base_url,
            &config.predict_path,
            config.timeout_secs,
            config.connect_timeout_secs,
        )
    }

    /// Service on localhost:8000 with the default timeouts.
    pub fn default_local() -> Result<Self, PredictionError> {
        Self::from_config(&PredictionConfig::default())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> PredictionError {
        if e.is_builder() {
            PredictionError::RequestMalformed(e.to_string())
        } else if e.is_connect() {
            PredictionError::Unreachable(format!("cannot connect to {}", self.base_url))
        } else if e.is_timeout() {
            PredictionError::Unreachable(format!(
                "Request timed out after {}s",
                self.timeout_secs
            ))
        } else {
            PredictionError::Unreachable(e.to_string())
        }
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn predict(
        &self,
        observation: &PatientObservation,
    ) -> Result<EvaluationResult, PredictionError> {
        observation
            .ensure_finite()
            .map_err(PredictionError::RequestMalformed)?;
        let body = serde_json::to_vec(observation)
            .map_err(|e| PredictionError::RequestMalformed(e.to_string()))?;

        tracing::debug!(
            endpoint = %self.endpoint,
            payload = %String::from_utf8_lossy(&body),
            "Sending observation to prediction service"
        );
        let started = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictionError::ServerRejected {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            PredictionError::Unreachable(format!("response body could not be read: {e}"))
        })?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| PredictionError::ServerRejected {
                status: status.as_u16(),
                body: format!("response is not JSON: {e}"),
            })?;

        tracing::info!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Prediction received"
        );
        Ok(EvaluationResult::new(value))
    }

    async fn ping(&self) -> Result<(), PredictionError> {
        let url = format!("{}/", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictionError::ServerRejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
