/// HTTP client tests against an in-process mock service.
///
/// Each test binds a `tiny_http` server on `127.0.0.1:0`, scripts its
/// responses, and points the real `ureq`-backed clients at it. No live
/// prediction service is needed.
use std::io::Read;
use std::thread;
use std::time::Duration;

use predictboard::client::{
    ClientError, MetricsClient, MetricsService, PredictionClient, PredictionService, Timestamp,
};
use predictboard::config::schema::ServiceConfig;
use predictboard::controller::{Dashboard, PredictOutcome, RefreshOutcome};
use tiny_http::{Header, Response, Server, StatusCode};

// ---------------------------------------------------------------------------
// Mock service
// ---------------------------------------------------------------------------

/// What the mock does with one incoming request.
enum Reply {
    Json(u16, &'static str),
    /// Hold the request longer than any client timeout used here.
    Stall,
}

/// A request as seen by the mock: method, path, body.
#[derive(Debug, Clone)]
struct Seen {
    method: String,
    path: String,
    body: String,
}

/// Start a mock that answers `replies` in order, then stops.
fn mock(replies: Vec<Reply>) -> (ServiceConfig, thread::JoinHandle<Vec<Seen>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for reply in replies {
            let mut request = server.recv().unwrap();
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            seen.push(Seen {
                method: request.method().to_string(),
                path: request.url().to_string(),
                body,
            });

            match reply {
                Reply::Json(status, text) => {
                    let header =
                        Header::from_bytes("Content-Type", "application/json").unwrap();
                    let resp = Response::from_string(text)
                        .with_header(header)
                        .with_status_code(StatusCode(status));
                    let _ = request.respond(resp);
                }
                Reply::Stall => {
                    thread::sleep(Duration::from_millis(600));
                    let _ = request.respond(Response::from_string("{}"));
                }
            }
        }
        seen
    });

    let config = ServiceConfig {
        base_url: format!("http://{addr}"),
        timeout_ms: 200,
    };
    (config, handle)
}

/// A config pointing at a port nothing listens on.
fn unreachable() -> ServiceConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    ServiceConfig {
        base_url: format!("http://{addr}"),
        timeout_ms: 200,
    }
}

const METRICS_B: &str = r#"{"prediction_distribution": {"0": 3, "1": 5}, "log": []}"#;

// ---------------------------------------------------------------------------
// PredictionClient
// ---------------------------------------------------------------------------

#[test]
fn predict_posts_features_and_reads_prediction() {
    let (config, handle) = mock(vec![Reply::Json(200, r#"{"prediction": 7}"#)]);
    let client = PredictionClient::from_config(&config);

    let value = client.predict(&[1.0, 2.0, 3.0, 4.0]).unwrap();

    assert_eq!(value, 7.0);
    let seen = handle.join().unwrap();
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].path, "/predict");
    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body, serde_json::json!({ "features": [1.0, 2.0, 3.0, 4.0] }));
}

#[test]
fn predict_sends_nan_as_null() {
    let (config, handle) = mock(vec![Reply::Json(200, r#"{"prediction": 0}"#)]);
    let client = PredictionClient::from_config(&config);

    client.predict(&[f64::NAN, 2.0]).unwrap();

    let seen = handle.join().unwrap();
    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body, serde_json::json!({ "features": [null, 2.0] }));
}

#[test]
fn predict_500_is_service_failure() {
    let (config, _handle) = mock(vec![Reply::Json(500, r#"{"detail": "boom"}"#)]);
    let client = PredictionClient::from_config(&config);

    assert_eq!(
        client.predict(&[1.0]),
        Err(ClientError::Service { status: 500 })
    );
}

#[test]
fn predict_422_is_service_failure() {
    let (config, _handle) = mock(vec![Reply::Json(422, r#"{"detail": []}"#)]);
    let client = PredictionClient::from_config(&config);

    assert_eq!(
        client.predict(&[f64::NAN]),
        Err(ClientError::Service { status: 422 })
    );
}

#[test]
fn predict_body_without_prediction_is_malformed() {
    let (config, _handle) = mock(vec![Reply::Json(200, r#"{"result": 7}"#)]);
    let client = PredictionClient::from_config(&config);

    assert!(matches!(
        client.predict(&[1.0]),
        Err(ClientError::Malformed(_))
    ));
}

#[test]
fn predict_non_json_body_is_malformed() {
    let (config, _handle) = mock(vec![Reply::Json(200, "<html>gateway</html>")]);
    let client = PredictionClient::from_config(&config);

    assert!(matches!(
        client.predict(&[1.0]),
        Err(ClientError::Malformed(_))
    ));
}

#[test]
fn predict_connection_refused_is_network_failure() {
    let client = PredictionClient::from_config(&unreachable());

    assert!(matches!(
        client.predict(&[1.0]),
        Err(ClientError::Network(_))
    ));
}

// ---------------------------------------------------------------------------
// MetricsClient
// ---------------------------------------------------------------------------

#[test]
fn metrics_decodes_distribution_and_empty_log() {
    let (config, handle) = mock(vec![Reply::Json(200, METRICS_B)]);
    let client = MetricsClient::from_config(&config);

    let snapshot = client.fetch_metrics().unwrap();

    assert_eq!(snapshot.distribution.len(), 2);
    assert_eq!(snapshot.distribution["0"], 3);
    assert_eq!(snapshot.distribution["1"], 5);
    assert!(snapshot.log.is_empty());
    let seen = handle.join().unwrap();
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].path, "/metrics");
}

#[test]
fn metrics_keeps_log_in_server_order() {
    let body = r#"{
        "prediction_distribution": {"1": 2},
        "log": [
            {"timestamp": "2024-05-02T09:00:00", "input": [6.0, 2.2, 5.0, 1.5], "prediction": 1},
            {"timestamp": "2024-05-01T09:00:00", "input": [5.9, 3.0, 4.2, 1.5], "prediction": 1}
        ]
    }"#;
    let (config, _handle) = mock(vec![Reply::Json(200, body)]);
    let client = MetricsClient::from_config(&config);

    let snapshot = client.fetch_metrics().unwrap();

    let stamps: Vec<String> = snapshot.log.iter().map(|e| e.timestamp.to_string()).collect();
    assert_eq!(stamps, vec!["2024-05-02T09:00:00", "2024-05-01T09:00:00"]);
    assert_eq!(
        snapshot.log[0].timestamp,
        Timestamp::Text("2024-05-02T09:00:00".to_string())
    );
}

#[test]
fn metrics_timeout_is_network_failure() {
    let (config, _handle) = mock(vec![Reply::Stall]);
    let client = MetricsClient::from_config(&config);

    assert!(matches!(
        client.fetch_metrics(),
        Err(ClientError::Network(_))
    ));
}

#[test]
fn metrics_wrong_shape_is_malformed() {
    let (config, _handle) = mock(vec![Reply::Json(200, r#"{"prediction_distribution": [3, 5], "log": []}"#)]);
    let client = MetricsClient::from_config(&config);

    assert!(matches!(
        client.fetch_metrics(),
        Err(ClientError::Malformed(_))
    ));
}

#[test]
fn fetching_unchanged_metrics_twice_is_idempotent() {
    let body = r#"{
        "prediction_distribution": {"0": 1, "2": 1},
        "log": [
            {"timestamp": 1, "input": [null, 2.0], "prediction": 0},
            {"timestamp": "2024-05-01T09:00:00", "input": [5.9, 3.0], "prediction": 2}
        ]
    }"#;
    let (config, _handle) = mock(vec![Reply::Json(200, body), Reply::Json(200, body)]);
    let client = MetricsClient::from_config(&config);

    let first = client.fetch_metrics().unwrap();
    let second = client.fetch_metrics().unwrap();

    assert_eq!(first.log[0].input, [None, Some(2.0)]);
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Controller over real HTTP
// ---------------------------------------------------------------------------

#[test]
fn predict_then_refresh_hit_the_service_in_order() {
    let (config, handle) = mock(vec![
        Reply::Json(200, METRICS_B),
        Reply::Json(200, r#"{"prediction": 7}"#),
        Reply::Json(200, r#"{"prediction_distribution": {"0": 3, "1": 5, "7": 1}, "log": []}"#),
    ]);
    let (mut dash, initial) = Dashboard::start(
        4,
        PredictionClient::from_config(&config),
        MetricsClient::from_config(&config),
    );
    assert_eq!(initial, RefreshOutcome::Refreshed);
    for (i, v) in ["1", "2", "3", "4"].iter().enumerate() {
        dash.edit(i, *v);
    }

    let outcome = dash.predict();

    assert_eq!(outcome.value(), Some(7.0));
    assert_eq!(dash.view().metrics.unwrap().distribution["7"], 1);
    let paths: Vec<String> = handle.join().unwrap().into_iter().map(|s| s.path).collect();
    assert_eq!(paths, vec!["/metrics", "/predict", "/metrics"]);
}

#[test]
fn predict_500_over_http_sends_no_metrics_request() {
    let (config, handle) = mock(vec![
        Reply::Json(200, METRICS_B),
        Reply::Json(500, "{}"),
    ]);
    let (mut dash, _) = Dashboard::start(
        4,
        PredictionClient::from_config(&config),
        MetricsClient::from_config(&config),
    );

    let outcome = dash.predict();

    assert_eq!(outcome, PredictOutcome::Failed(ClientError::Service { status: 500 }));
    assert_eq!(dash.view().prediction, None);
    assert_eq!(handle.join().unwrap().len(), 2);
    assert_eq!(dash.view().refreshes_issued, 1);
}

#[test]
fn metrics_timeout_over_http_keeps_previous_snapshot() {
    let (config, _handle) = mock(vec![Reply::Json(200, METRICS_B), Reply::Stall]);
    let (mut dash, _) = Dashboard::start(
        4,
        PredictionClient::from_config(&config),
        MetricsClient::from_config(&config),
    );
    let before = dash.view().metrics.cloned().unwrap();

    let outcome = dash.refresh_metrics();

    assert!(matches!(outcome, RefreshOutcome::Failed(ClientError::Network(_))));
    assert_eq!(dash.view().metrics, Some(&before));
}
