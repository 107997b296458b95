/// Client for `POST /predict`.
///
/// Request body is `{ "features": [number, ...] }`; a success body must carry
/// a numeric `prediction`. One request per call, no retry, no idempotency
/// key: submitting the same vector twice produces two server-side log
/// entries.
use serde::{Deserialize, Serialize};

use super::{ClientError, Endpoint, PredictionService};
use crate::config::schema::ServiceConfig;
use crate::diagnostics::{Operation, Reporter};

/// Request body for `POST /predict`.
#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    features: &'a [f64],
}

/// Response body from `POST /predict`.
#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: f64,
}

/// Synchronous client for the prediction endpoint.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    endpoint: Endpoint,
}

impl PredictionClient {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            endpoint: Endpoint::from_config(config),
        }
    }

    /// Record every round-trip through `reporter`.
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.endpoint.set_reporter(reporter);
        self
    }

    pub fn base_url(&self) -> &str {
        self.endpoint.base_url()
    }
}

impl PredictionService for PredictionClient {
    fn predict(&self, features: &[f64]) -> Result<f64, ClientError> {
        let url = self.endpoint.url("/predict");
        let body = PredictRequest { features };

        let parsed: PredictResponse = self
            .endpoint
            .exchange(Operation::Predict, |agent| agent.post(&url).send_json(&body))?;

        Ok(parsed.prediction)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
