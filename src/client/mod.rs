/// HTTP clients for the remote prediction service.
///
/// Two endpoints live on the same origin (`service.base_url`):
///
/// - `POST /predict`: [`predict::PredictionClient`]
/// - `GET /metrics`: [`metrics::MetricsClient`]
///
/// Both use the synchronous `ureq` client with a per-request timeout. Every
/// failure is converted into a [`ClientError`] at this boundary; nothing
/// past the client ever sees a transport error or a raw JSON value. Each
/// round-trip is recorded through [`Reporter`](crate::diagnostics::Reporter).
///
/// The controller talks to the clients through the [`PredictionService`] and
/// [`MetricsService`] traits so it can be driven by fakes in tests.
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::diagnostics::{Operation, RequestRecord, Reporter};

pub mod metrics;
pub mod predict;

pub use metrics::{LogEntry, MetricsClient, MetricsSnapshot, Timestamp};
pub use predict::PredictionClient;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Why a single client round-trip failed. Failures are terminal for the
/// invocation; there is no retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Connection, DNS, TLS, timeout, or an error while reading the body.
    #[error("network failure: {0}")]
    Network(String),
    /// The service answered with a non-2xx status.
    #[error("service returned HTTP {status}")]
    Service { status: u16 },
    /// The body was not JSON or did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ClientError {
    /// Short machine-readable kind for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Service { .. } => "service",
            Self::Malformed(_) => "malformed",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status } => Some(*status),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Service seams
// ---------------------------------------------------------------------------

/// Anything that can turn a numeric feature vector into a prediction.
pub trait PredictionService {
    fn predict(&self, features: &[f64]) -> Result<f64, ClientError>;
}

/// Anything that can produce a metrics snapshot.
pub trait MetricsService {
    fn fetch_metrics(&self) -> Result<MetricsSnapshot, ClientError>;
}

// ---------------------------------------------------------------------------
// Shared HTTP plumbing
// ---------------------------------------------------------------------------

/// One configured origin plus the agent used to reach it.
#[derive(Clone)]
pub(crate) struct Endpoint {
    base_url: String,
    agent: ureq::Agent,
    reporter: Reporter,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url)
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    pub(crate) fn from_config(config: &ServiceConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            agent,
            reporter: Reporter::silent(),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn set_reporter(&mut self, reporter: Reporter) {
        self.reporter = reporter;
    }

    /// Run one request, decode its body as `T`, and record the outcome.
    pub(crate) fn exchange<T, F>(&self, operation: Operation, send: F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: FnOnce(&ureq::Agent) -> Result<ureq::Response, ureq::Error>,
    {
        let start = Instant::now();
        let result = send(&self.agent).map_err(classify).and_then(decode::<T>);
        let latency_ms = start.elapsed().as_millis() as u64;

        let record = match &result {
            Ok(_) => RequestRecord::success(operation, latency_ms),
            Err(e) => RequestRecord::failure(operation, latency_ms, e),
        };
        self.reporter.record(&record);

        result
    }
}

/// Map a `ureq` error onto the client taxonomy.
fn classify(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(status, _) => ClientError::Service { status },
        ureq::Error::Transport(t) => ClientError::Network(t.to_string()),
    }
}

/// Check the status and decode the body into a typed schema.
fn decode<T: DeserializeOwned>(resp: ureq::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !(200..300).contains(&status) {
        return Err(ClientError::Service { status });
    }

    let body = resp
        .into_string()
        .map_err(|e| ClientError::Network(format!("failed to read response body: {e}")))?;

    serde_json::from_str(&body).map_err(|e| ClientError::Malformed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
