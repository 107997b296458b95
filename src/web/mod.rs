//! Local web dashboard for predictboard.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - The server-rendered dashboard page with the feature form
//! - Form actions for predict and refresh
//! - A small JSON API over the same controller
//!
//! Requests are handled one at a time on the calling thread. That loop owns
//! the [`Dashboard`], so every transition is applied to completion before the
//! next request is read. Launched via `predictboard serve` (default:
//! `http://127.0.0.1:9747`).

mod api;

use std::io::Cursor;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::client::{MetricsService, PredictionService};
use crate::controller::Dashboard;
use crate::render::html;

pub(crate) type HttpResponse = Response<Cursor<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server on the given address.
///
/// Blocks the current thread. Errors are handled per request without
/// stopping the server.
pub fn serve<P, M>(addr: &str, dashboard: &mut Dashboard<P, M>, open: bool) -> Result<()>
where
    P: PredictionService,
    M: MetricsService,
{
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("predictboard dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    if open {
        let _ = open_browser(&format!("http://{addr}"));
    }

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let resp = match dispatch(dashboard, &method, &url, body.as_deref()) {
            Ok(resp) => resp,
            Err(e) => api::error_response(500, &format!("{e:#}")),
        };
        let _ = request.respond(resp);

        println!(
            "{} {} {}",
            method,
            url,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch one request against the dashboard.
pub(crate) fn dispatch<P, M>(
    dashboard: &mut Dashboard<P, M>,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<HttpResponse>
where
    P: PredictionService,
    M: MetricsService,
{
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        // Page + form actions
        (&Method::Get, "/") | (&Method::Get, "/index.html") => {
            Ok(html_response(&html::render_page(&dashboard.view())))
        }
        (&Method::Post, "/predict") => {
            apply_form(dashboard, body.unwrap_or(""));
            dashboard.predict();
            Ok(see_other("/"))
        }
        (&Method::Post, "/refresh") => {
            apply_form(dashboard, body.unwrap_or(""));
            dashboard.refresh_metrics();
            Ok(see_other("/"))
        }

        // JSON API
        (&Method::Get, "/api/state") => api::get_state(dashboard),
        (&Method::Post, "/api/edit") => api::post_edit(dashboard, body.unwrap_or("{}")),
        (&Method::Post, "/api/predict") => api::post_predict(dashboard),
        (&Method::Post, "/api/refresh") => api::post_refresh(dashboard),

        _ => Ok(api::error_response(404, "not found")),
    }
}

/// Apply the `f{i}` fields of a form body as Edit transitions.
///
/// Fields for slots outside the form and unrelated fields are ignored.
fn apply_form<P, M>(dashboard: &mut Dashboard<P, M>, body: &str)
where
    P: PredictionService,
    M: MetricsService,
{
    for (name, value) in url::form_urlencoded::parse(body.as_bytes()) {
        if let Some(index) = name.strip_prefix('f').and_then(|i| i.parse::<usize>().ok()) {
            let _ = dashboard.try_edit(index, value.into_owned());
        }
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn html_response(page: &str) -> HttpResponse {
    Response::from_data(page.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

/// Post/redirect/get back to the page.
fn see_other(location: &str) -> HttpResponse {
    let mut resp = Response::from_data(Vec::new()).with_status_code(StatusCode(303));
    if let Ok(header) = Header::from_bytes("Location", location) {
        resp.add_header(header);
    }
    resp
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

/// HTML content type header.
fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap()
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::io::Read;

    use super::*;
    use crate::client::{ClientError, MetricsSnapshot};

    struct SumPredictor;

    impl PredictionService for SumPredictor {
        fn predict(&self, features: &[f64]) -> Result<f64, ClientError> {
            Ok(features.iter().sum())
        }
    }

    struct CountingMetrics(Cell<u64>);

    impl MetricsService for CountingMetrics {
        fn fetch_metrics(&self) -> Result<MetricsSnapshot, ClientError> {
            self.0.set(self.0.get() + 1);
            Ok(MetricsSnapshot {
                distribution: BTreeMap::from([("0".to_string(), self.0.get())]),
                log: Vec::new(),
            })
        }
    }

    fn dashboard() -> Dashboard<SumPredictor, CountingMetrics> {
        Dashboard::new(3, SumPredictor, CountingMetrics(Cell::new(0)))
    }

    fn body_of(resp: HttpResponse) -> String {
        let mut out = String::new();
        resp.into_reader().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn index_renders_one_input_per_slot() {
        let mut dash = dashboard();
        let resp = dispatch(&mut dash, &Method::Get, "/", None).unwrap();
        assert_eq!(resp.status_code(), StatusCode(200));
        let page = body_of(resp);
        assert_eq!(page.matches("<input").count(), 3);
        assert!(!page.contains("Prediction Result"));
    }

    #[test]
    fn form_post_edits_predicts_and_redirects() {
        let mut dash = dashboard();
        let resp = dispatch(&mut dash, &Method::Post, "/predict", Some("f0=1&f1=2.5&f2=%201")).unwrap();
        assert_eq!(resp.status_code(), StatusCode(303));
        let view = dash.view();
        assert_eq!(view.features, ["1", "2.5", " 1"]);
        assert_eq!(view.prediction, Some(4.5));
        assert_eq!(view.refreshes_issued, 1);
    }

    #[test]
    fn form_ignores_unknown_and_out_of_range_fields() {
        let mut dash = dashboard();
        dispatch(&mut dash, &Method::Post, "/refresh", Some("f9=1&x=2&f1=3")).unwrap();
        assert_eq!(dash.view().features, ["", "3", ""]);
        assert_eq!(dash.view().prediction, None);
    }

    #[test]
    fn unknown_route_is_404() {
        let mut dash = dashboard();
        let resp = dispatch(&mut dash, &Method::Get, "/nope", None).unwrap();
        assert_eq!(resp.status_code(), StatusCode(404));
    }
}
