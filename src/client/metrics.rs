/// Client for `GET /metrics` and the snapshot types it decodes into.
///
/// The body is taken verbatim: no client-side aggregation, re-ordering, or
/// validation of individual log entries beyond their typed shape.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ClientError, Endpoint, MetricsService};
use crate::config::schema::ServiceConfig;
use crate::diagnostics::{Operation, Reporter};

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Aggregate view returned by the metrics endpoint.
///
/// Replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Count of past predictions per label.
    #[serde(rename = "prediction_distribution")]
    pub distribution: BTreeMap<String, u64>,
    /// Recent requests, in the order the server returned them.
    pub log: Vec<LogEntry>,
}

impl MetricsSnapshot {
    /// Distribution entries in display order: numeric labels ascending by
    /// value, then the remaining labels lexicographically.
    pub fn ordered_distribution(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .distribution
            .iter()
            .map(|(label, count)| (label.as_str(), *count))
            .collect();
        entries.sort_by(|(a, _), (b, _)| {
            match (a.parse::<f64>().ok(), b.parse::<f64>().ok()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.cmp(b),
            }
        });
        entries
    }

    /// Largest single count, or 0 for an empty distribution.
    pub fn max_count(&self) -> u64 {
        self.distribution.values().copied().max().unwrap_or(0)
    }
}

/// One historical prediction as recorded by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    /// Feature vector of that request. Slots submitted as `null` stay `None`.
    pub input: Vec<Option<f64>>,
    pub prediction: f64,
}

/// Server-provided instant, kept exactly as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous client for the metrics endpoint.
#[derive(Debug, Clone)]
pub struct MetricsClient {
    endpoint: Endpoint,
}

impl MetricsClient {
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

impl MetricsService for MetricsClient {
    fn fetch_metrics(&self) -> Result<MetricsSnapshot, ClientError> {
        let url = self.endpoint.url("/metrics");
        self.endpoint
            .exchange(Operation::Metrics, |agent| agent.get(&url).call())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
