//! JSON API handlers for the web dashboard.
//!
//! Each handler runs one controller transition (or none, for reads) and
//! returns a JSON response.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use super::{HttpResponse, content_type_json};
use crate::client::{MetricsService, MetricsSnapshot, PredictionService};
use crate::controller::{Dashboard, PredictOutcome, RefreshOutcome};

// ---------------------------------------------------------------------------
// JSON types
// ---------------------------------------------------------------------------

/// `GET /api/state`: the read-only view as JSON.
#[derive(Serialize)]
struct StateResponse<'a> {
    features: &'a [String],
    invalid_slots: Vec<usize>,
    prediction: Option<f64>,
    metrics: Option<&'a MetricsSnapshot>,
    last_failure: Option<FailureResponse>,
    predictions_made: u64,
    refreshes_issued: u64,
}

#[derive(Debug, Serialize, PartialEq)]
struct FailureResponse {
    operation: String,
    kind: &'static str,
    error: String,
}

#[derive(Deserialize)]
struct EditRequest {
    index: usize,
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum PredictResponse {
    Predicted {
        prediction: f64,
        refresh: RefreshResponse,
    },
    Failed {
        kind: &'static str,
        error: String,
    },
    Rejected {
        slots: Vec<usize>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum RefreshResponse {
    Refreshed,
    Failed { kind: &'static str, error: String },
}

impl From<&RefreshOutcome> for RefreshResponse {
    fn from(outcome: &RefreshOutcome) -> Self {
        match outcome {
            RefreshOutcome::Refreshed => Self::Refreshed,
            RefreshOutcome::Failed(e) => Self::Failed {
                kind: e.kind(),
                error: e.to_string(),
            },
        }
    }
}

impl From<&PredictOutcome> for PredictResponse {
    fn from(outcome: &PredictOutcome) -> Self {
        match outcome {
            PredictOutcome::Predicted { value, refresh } => Self::Predicted {
                prediction: *value,
                refresh: refresh.into(),
            },
            PredictOutcome::Failed(e) => Self::Failed {
                kind: e.kind(),
                error: e.to_string(),
            },
            PredictOutcome::Rejected { slots } => Self::Rejected {
                slots: slots.clone(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

/// Build a JSON error response with the given status.
pub(crate) fn error_response(status: u16, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /api/state`
pub fn get_state<P, M>(dashboard: &Dashboard<P, M>) -> Result<HttpResponse>
where
    P: PredictionService,
    M: MetricsService,
{
    let view = dashboard.view();
    let resp = StateResponse {
        features: view.features,
        invalid_slots: view.invalid_slots.clone(),
        prediction: view.prediction,
        metrics: view.metrics,
        last_failure: view.last_failure.map(|f| FailureResponse {
            operation: f.operation.to_string(),
            kind: f.error.kind(),
            error: f.error.to_string(),
        }),
        predictions_made: view.predictions_made,
        refreshes_issued: view.refreshes_issued,
    };
    json_response(&resp)
}

/// `POST /api/edit`: body `{ "index": 0, "value": "5.1" }`.
pub fn post_edit<P, M>(dashboard: &mut Dashboard<P, M>, body: &str) -> Result<HttpResponse>
where
    P: PredictionService,
    M: MetricsService,
{
    let req: EditRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => return Ok(error_response(400, &format!("invalid edit request: {e}"))),
    };

    match dashboard.try_edit(req.index, req.value) {
        Ok(()) => get_state(dashboard),
        Err(e) => Ok(error_response(400, &e.to_string())),
    }
}

/// `POST /api/predict`
pub fn post_predict<P, M>(dashboard: &mut Dashboard<P, M>) -> Result<HttpResponse>
where
    P: PredictionService,
    M: MetricsService,
{
    let outcome = dashboard.predict();
    json_response(&PredictResponse::from(&outcome))
}

/// `POST /api/refresh`
pub fn post_refresh<P, M>(dashboard: &mut Dashboard<P, M>) -> Result<HttpResponse>
where
    P: PredictionService,
    M: MetricsService,
{
    let outcome = dashboard.refresh_metrics();
    json_response(&RefreshResponse::from(&outcome))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
