/// Dashboard controller: the single owner of session state.
///
/// Three independent cells make up the state:
///
/// - the [`FeatureVector`] being edited,
/// - the latest prediction (absent until a predict succeeds),
/// - the latest [`MetricsSnapshot`] (absent until a fetch succeeds).
///
/// All writes go through `&mut self`, so transitions are serialized by
/// construction. Renderers only ever see a [`DashboardView`], a read-only
/// projection borrowed from the controller.
///
/// # Transitions
///
/// - **Edit**: [`Dashboard::edit`] replaces one slot; nothing else changes.
/// - **Predict**: [`Dashboard::predict`] coerces the form, calls the
///   prediction service, and on success commits the value and then runs
///   exactly one Metrics-Refresh. The refresh starts only after the predict
///   call has returned. A failed predict leaves the previous prediction in
///   place and triggers no refresh.
/// - **Metrics-Refresh**: [`Dashboard::refresh_metrics`] replaces the
///   snapshot on success and keeps the previous one on failure.
///
/// The snapshot fetched right after a predict is not guaranteed to contain
/// that prediction yet; the service may still be processing it.
use crate::client::{ClientError, MetricsService, MetricsSnapshot, PredictionService};
use crate::diagnostics::Operation;
use crate::features::{FeatureVector, SlotOutOfRange};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a Metrics-Refresh transition.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The snapshot was replaced.
    Refreshed,
    /// The fetch failed; the previous snapshot (if any) is still displayed.
    Failed(ClientError),
}

impl RefreshOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed)
    }
}

/// Result of a Predict transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutcome {
    /// The prediction was committed and one refresh ran afterwards.
    Predicted { value: f64, refresh: RefreshOutcome },
    /// The service call failed; the previous prediction is unchanged.
    Failed(ClientError),
    /// Strict mode refused to submit non-numeric slots. No request was sent.
    Rejected { slots: Vec<usize> },
}

impl PredictOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Predicted { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// Most recent failure, kept for display and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct LastFailure {
    pub operation: Operation,
    pub error: ClientError,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Session controller, generic over the two service seams.
#[derive(Debug)]
pub struct Dashboard<P, M> {
    features: FeatureVector,
    prediction: Option<f64>,
    metrics: Option<MetricsSnapshot>,
    last_failure: Option<LastFailure>,
    strict: bool,
    predictions_made: u64,
    refreshes_issued: u64,
    predictor: P,
    metrics_source: M,
}

impl<P, M> Dashboard<P, M>
where
    P: PredictionService,
    M: MetricsService,
{
    /// Build a controller with an empty form of `arity` slots. No request
    /// is made; see [`start`](Self::start).
    pub fn new(arity: usize, predictor: P, metrics_source: M) -> Self {
        Self {
            features: FeatureVector::new(arity),
            prediction: None,
            metrics: None,
            last_failure: None,
            strict: false,
            predictions_made: 0,
            refreshes_issued: 0,
            predictor,
            metrics_source,
        }
    }

    /// Build a controller and run the initial Metrics-Refresh.
    pub fn start(arity: usize, predictor: P, metrics_source: M) -> (Self, RefreshOutcome) {
        let mut dashboard = Self::new(arity, predictor, metrics_source);
        let outcome = dashboard.refresh_metrics();
        (dashboard, outcome)
    }

    /// Refuse to submit forms containing non-numeric slots.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    // -- Edit ---------------------------------------------------------------

    /// Replace slot `index` with `raw`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the form.
    pub fn edit(&mut self, index: usize, raw: impl Into<String>) {
        self.features.set(index, raw);
    }

    /// Checked edit for indices that come from user input.
    pub fn try_edit(&mut self, index: usize, raw: impl Into<String>) -> Result<(), SlotOutOfRange> {
        self.features.try_set(index, raw)
    }

    // -- Predict ------------------------------------------------------------

    /// Submit the current form and, on success, refresh metrics once.
    pub fn predict(&mut self) -> PredictOutcome {
        if self.strict {
            let slots = self.features.invalid_slots();
            if !slots.is_empty() {
                return PredictOutcome::Rejected { slots };
            }
        }

        let vector = self.features.to_numeric();
        match self.predictor.predict(&vector) {
            Ok(value) => {
                self.prediction = Some(value);
                self.predictions_made += 1;
                self.clear_failure(Operation::Predict);
                let refresh = self.refresh_metrics();
                PredictOutcome::Predicted { value, refresh }
            }
            Err(error) => {
                self.last_failure = Some(LastFailure {
                    operation: Operation::Predict,
                    error: error.clone(),
                });
                PredictOutcome::Failed(error)
            }
        }
    }

    // -- Metrics-Refresh ----------------------------------------------------

    /// Fetch a new snapshot; keep the old one if the fetch fails.
    pub fn refresh_metrics(&mut self) -> RefreshOutcome {
        self.refreshes_issued += 1;
        match self.metrics_source.fetch_metrics() {
            Ok(snapshot) => {
                self.metrics = Some(snapshot);
                self.clear_failure(Operation::Metrics);
                RefreshOutcome::Refreshed
            }
            Err(error) => {
                self.last_failure = Some(LastFailure {
                    operation: Operation::Metrics,
                    error: error.clone(),
                });
                RefreshOutcome::Failed(error)
            }
        }
    }

    fn clear_failure(&mut self, operation: Operation) {
        if self
            .last_failure
            .as_ref()
            .is_some_and(|f| f.operation == operation)
        {
            self.last_failure = None;
        }
    }

    // -- Projection ---------------------------------------------------------

    /// Read-only projection for renderers.
    pub fn view(&self) -> DashboardView<'_> {
        DashboardView {
            features: self.features.snapshot(),
            invalid_slots: self.features.invalid_slots(),
            prediction: self.prediction,
            metrics: self.metrics.as_ref(),
            last_failure: self.last_failure.as_ref(),
            predictions_made: self.predictions_made,
            refreshes_issued: self.refreshes_issued,
        }
    }

    pub fn arity(&self) -> usize {
        self.features.arity()
    }
}

/// Everything a renderer may look at. Borrowed, never mutable.
#[derive(Debug, Clone)]
pub struct DashboardView<'a> {
    pub features: &'a [String],
    /// Slots whose text does not coerce to a finite number.
    pub invalid_slots: Vec<usize>,
    pub prediction: Option<f64>,
    pub metrics: Option<&'a MetricsSnapshot>,
    pub last_failure: Option<&'a LastFailure>,
    pub predictions_made: u64,
    pub refreshes_issued: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
