/// Dashboard controller tests.
///
/// Drive the controller through fake services that count calls and return
/// scripted results, so transitions and refresh scheduling are observable
/// without a network. HTTP behavior is covered in `client_tests.rs`.
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use predictboard::client::{
    ClientError, LogEntry, MetricsService, MetricsSnapshot, PredictionService, Timestamp,
};
use predictboard::controller::{Dashboard, PredictOutcome, RefreshOutcome};
use predictboard::diagnostics::Operation;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Returns scripted prediction results in order and records each request.
#[derive(Clone, Default)]
struct FakePredictor {
    script: Rc<RefCell<Vec<Result<f64, ClientError>>>>,
    requests: Rc<RefCell<Vec<Vec<f64>>>>,
}

impl FakePredictor {
    fn with(results: Vec<Result<f64, ClientError>>) -> Self {
        Self {
            script: Rc::new(RefCell::new(results)),
            requests: Rc::default(),
        }
    }
}

impl PredictionService for FakePredictor {
    fn predict(&self, features: &[f64]) -> Result<f64, ClientError> {
        self.requests.borrow_mut().push(features.to_vec());
        self.script.borrow_mut().remove(0)
    }
}

/// Returns scripted snapshots in order, repeating the last one, and counts
/// fetches.
#[derive(Clone, Default)]
struct FakeMetrics {
    script: Rc<RefCell<Vec<Result<MetricsSnapshot, ClientError>>>>,
    calls: Rc<Cell<usize>>,
}

impl FakeMetrics {
    fn with(results: Vec<Result<MetricsSnapshot, ClientError>>) -> Self {
        Self {
            script: Rc::new(RefCell::new(results)),
            calls: Rc::default(),
        }
    }
}

impl MetricsService for FakeMetrics {
    fn fetch_metrics(&self) -> Result<MetricsSnapshot, ClientError> {
        self.calls.set(self.calls.get() + 1);
        let mut script = self.script.borrow_mut();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script[0].clone()
        }
    }
}

fn snapshot(pairs: &[(&str, u64)]) -> MetricsSnapshot {
    MetricsSnapshot {
        distribution: pairs
            .iter()
            .map(|(label, count)| (label.to_string(), *count))
            .collect::<BTreeMap<_, _>>(),
        log: Vec::new(),
    }
}

fn timeout() -> ClientError {
    ClientError::Network("timed out reading response".to_string())
}

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

#[test]
fn edit_touches_only_its_slot() {
    let mut dash = Dashboard::new(4, FakePredictor::default(), FakeMetrics::default());
    dash.edit(1, "2.0");
    dash.edit(3, "x");
    dash.edit(1, "2.5");

    let view = dash.view();
    assert_eq!(view.features, ["", "2.5", "", "x"]);
    assert_eq!(view.prediction, None);
    assert!(view.metrics.is_none());
}

#[test]
fn every_single_edit_preserves_other_slots() {
    let mut dash = Dashboard::new(5, FakePredictor::default(), FakeMetrics::default());
    for i in 0..5 {
        dash.edit(i, format!("{i}"));
    }
    for i in 0..5 {
        let before: Vec<String> = dash.view().features.to_vec();
        dash.edit(i, "edited");
        let after = dash.view().features;
        for j in 0..5 {
            if j == i {
                assert_eq!(after[j], "edited");
            } else {
                assert_eq!(after[j], before[j], "slot {j} changed when editing {i}");
            }
        }
    }
}

#[test]
fn try_edit_out_of_range_is_an_error() {
    let mut dash = Dashboard::new(4, FakePredictor::default(), FakeMetrics::default());
    assert!(dash.try_edit(4, "1").is_err());
    assert_eq!(dash.view().features, ["", "", "", ""]);
}

#[test]
#[should_panic]
fn edit_out_of_range_panics() {
    let mut dash = Dashboard::new(2, FakePredictor::default(), FakeMetrics::default());
    dash.edit(2, "1");
}

// ---------------------------------------------------------------------------
// Initial refresh
// ---------------------------------------------------------------------------

#[test]
fn start_refreshes_metrics_once() {
    let metrics = FakeMetrics::with(vec![Ok(snapshot(&[("0", 1)]))]);
    let (dash, outcome) = Dashboard::start(4, FakePredictor::default(), metrics.clone());

    assert_eq!(outcome, RefreshOutcome::Refreshed);
    assert_eq!(metrics.calls.get(), 1);
    assert_eq!(dash.view().metrics, Some(&snapshot(&[("0", 1)])));
}

#[test]
fn start_with_unreachable_metrics_leaves_snapshot_absent() {
    let metrics = FakeMetrics::with(vec![Err(timeout())]);
    let (dash, outcome) = Dashboard::start(4, FakePredictor::default(), metrics);

    assert!(matches!(outcome, RefreshOutcome::Failed(ClientError::Network(_))));
    assert!(dash.view().metrics.is_none());
}

// ---------------------------------------------------------------------------
// Predict
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_prediction_committed_and_refresh_issued() {
    let predictor = FakePredictor::with(vec![Ok(7.0)]);
    let metrics = FakeMetrics::with(vec![Ok(snapshot(&[("7", 1)]))]);
    let mut dash = Dashboard::new(4, predictor.clone(), metrics.clone());
    for (i, v) in ["1", "2", "3", "4"].iter().enumerate() {
        dash.edit(i, *v);
    }

    let outcome = dash.predict();

    assert_eq!(
        outcome,
        PredictOutcome::Predicted {
            value: 7.0,
            refresh: RefreshOutcome::Refreshed
        }
    );
    assert_eq!(predictor.requests.borrow().as_slice(), [vec![1.0, 2.0, 3.0, 4.0]]);
    assert_eq!(metrics.calls.get(), 1);
    assert_eq!(dash.view().prediction, Some(7.0));
    assert_eq!(dash.view().predictions_made, 1);
}

#[test]
fn successful_predict_schedules_exactly_one_refresh() {
    let predictor = FakePredictor::with(vec![Ok(1.0), Ok(2.0), Ok(3.0)]);
    let metrics = FakeMetrics::with(vec![Ok(snapshot(&[]))]);
    let mut dash = Dashboard::new(2, predictor, metrics.clone());

    for n in 1..=3 {
        dash.predict();
        assert_eq!(metrics.calls.get(), n);
    }
    assert_eq!(dash.view().refreshes_issued, 3);
}

#[test]
fn scenario_c_service_error_keeps_prior_prediction_and_skips_refresh() {
    let predictor = FakePredictor::with(vec![Ok(7.0), Err(ClientError::Service { status: 500 })]);
    let metrics = FakeMetrics::with(vec![Ok(snapshot(&[("7", 1)]))]);
    let mut dash = Dashboard::new(4, predictor, metrics.clone());

    dash.predict();
    assert_eq!(metrics.calls.get(), 1);

    let outcome = dash.predict();

    assert_eq!(outcome, PredictOutcome::Failed(ClientError::Service { status: 500 }));
    assert_eq!(dash.view().prediction, Some(7.0));
    assert_eq!(metrics.calls.get(), 1, "failed predict must not refresh");
    let failure = dash.view().last_failure.cloned().unwrap();
    assert_eq!(failure.operation, Operation::Predict);
}

#[test]
fn first_predict_failure_leaves_prediction_absent() {
    let predictor = FakePredictor::with(vec![Err(ClientError::Malformed("missing field".into()))]);
    let metrics = FakeMetrics::with(vec![Ok(snapshot(&[]))]);
    let mut dash = Dashboard::new(4, predictor, metrics.clone());

    assert!(matches!(dash.predict(), PredictOutcome::Failed(ClientError::Malformed(_))));
    assert_eq!(dash.view().prediction, None);
    assert_eq!(metrics.calls.get(), 0);
}

#[test]
fn predict_always_yields_a_defined_outcome() {
    let vectors = [
        vec!["1", "2", "3", "4"],
        vec!["-0.5", "1e3", "0", "7"],
        vec!["", "abc", " 2 ", "NaN"],
    ];
    for raw in vectors {
        let predictor = FakePredictor::with(vec![Err(timeout())]);
        let mut dash = Dashboard::new(4, predictor, FakeMetrics::with(vec![Ok(snapshot(&[]))]));
        for (i, v) in raw.iter().enumerate() {
            dash.edit(i, *v);
        }
        match dash.predict() {
            PredictOutcome::Failed(_) => assert_eq!(dash.view().prediction, None),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

#[test]
fn permissive_mode_sends_nan_for_non_numeric_slots() {
    let predictor = FakePredictor::with(vec![Ok(0.0)]);
    let mut dash = Dashboard::new(3, predictor.clone(), FakeMetrics::with(vec![Ok(snapshot(&[]))]));
    dash.edit(0, "1");
    dash.edit(1, "abc");

    dash.predict();

    let sent = &predictor.requests.borrow()[0];
    assert_eq!(sent[0], 1.0);
    assert!(sent[1].is_nan());
    assert!(sent[2].is_nan());
}

#[test]
fn strict_mode_rejects_before_any_request() {
    let predictor = FakePredictor::with(vec![Ok(0.0)]);
    let metrics = FakeMetrics::with(vec![Ok(snapshot(&[]))]);
    let mut dash = Dashboard::new(3, predictor.clone(), metrics.clone()).with_strict(true);
    dash.edit(0, "1");
    dash.edit(2, "three");

    assert_eq!(dash.predict(), PredictOutcome::Rejected { slots: vec![1, 2] });
    assert!(predictor.requests.borrow().is_empty());
    assert_eq!(metrics.calls.get(), 0);
}

#[test]
fn predict_success_with_failed_refresh_still_commits_prediction() {
    let predictor = FakePredictor::with(vec![Ok(2.0)]);
    let metrics = FakeMetrics::with(vec![Err(ClientError::Service { status: 503 })]);
    let mut dash = Dashboard::new(1, predictor, metrics);

    let outcome = dash.predict();

    assert_eq!(
        outcome,
        PredictOutcome::Predicted {
            value: 2.0,
            refresh: RefreshOutcome::Failed(ClientError::Service { status: 503 })
        }
    );
    assert_eq!(dash.view().prediction, Some(2.0));
    assert!(dash.view().metrics.is_none());
}

// ---------------------------------------------------------------------------
// Metrics-Refresh
// ---------------------------------------------------------------------------

#[test]
fn scenario_d_failed_refresh_keeps_previous_snapshot() {
    let first = snapshot(&[("0", 3), ("1", 5)]);
    let metrics = FakeMetrics::with(vec![Ok(first.clone()), Err(timeout())]);
    let (mut dash, _) = Dashboard::start(4, FakePredictor::default(), metrics);

    let outcome = dash.refresh_metrics();

    assert!(!outcome.is_refreshed());
    assert_eq!(dash.view().metrics, Some(&first));
}

#[test]
fn successful_refresh_replaces_snapshot_wholesale() {
    let metrics = FakeMetrics::with(vec![
        Ok(snapshot(&[("0", 3), ("1", 5)])),
        Ok(snapshot(&[("2", 1)])),
    ]);
    let (mut dash, _) = Dashboard::start(4, FakePredictor::default(), metrics);

    dash.refresh_metrics();

    assert_eq!(dash.view().metrics, Some(&snapshot(&[("2", 1)])));
}

#[test]
fn refresh_after_predict_need_not_contain_the_new_prediction() {
    // The service may lag; the controller commits whatever it is given.
    let stale = snapshot(&[("0", 3)]);
    let predictor = FakePredictor::with(vec![Ok(1.0)]);
    let metrics = FakeMetrics::with(vec![Ok(stale.clone())]);
    let (mut dash, _) = Dashboard::start(4, predictor, metrics);

    dash.predict();

    assert_eq!(dash.view().prediction, Some(1.0));
    assert_eq!(dash.view().metrics, Some(&stale));
}

#[test]
fn repeated_fetches_of_unchanged_server_state_are_equal() {
    let mut snap = snapshot(&[("0", 3)]);
    snap.log.push(LogEntry {
        timestamp: Timestamp::Text("2024-05-01T10:00:00".into()),
        input: vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
        prediction: 0.0,
    });
    let metrics = FakeMetrics::with(vec![Ok(snap)]);

    let a = metrics.fetch_metrics().unwrap();
    let b = metrics.fetch_metrics().unwrap();

    assert_eq!(a, b);
}
