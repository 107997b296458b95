//! Server-rendered HTML page for the web dashboard.
//!
//! The page has no script: inputs live in a form that posts to `/predict`,
//! and every response re-renders the page from the current view. All text
//! that originates from the user or the service is escaped.

use std::fmt::Write;

use super::{DashboardView, EMPTY_LOG, format_input, format_number};
use crate::client::MetricsSnapshot;

/// Render the complete dashboard document.
pub fn render_page(view: &DashboardView<'_>) -> String {
    let mut body = String::new();

    body.push_str(&render_form(view));
    body.push_str(&render_result(view));
    if let Some(metrics) = view.metrics {
        body.push_str(&render_distribution(metrics));
        body.push_str(&render_log(metrics));
    }

    format!("{HEAD}{body}{TAIL}")
}

/// Feature inputs plus the predict and refresh controls.
pub fn render_form(view: &DashboardView<'_>) -> String {
    let mut out = String::new();
    out.push_str("<section class=\"card\">\n<form method=\"post\" action=\"/predict\">\n");
    for (i, raw) in view.features.iter().enumerate() {
        let class = if view.invalid_slots.contains(&i) && !raw.is_empty() {
            " class=\"invalid\""
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "<input type=\"text\" inputmode=\"decimal\" name=\"f{i}\" value=\"{}\" placeholder=\"Feature {}\"{class}>",
            escape(raw),
            i + 1
        );
    }
    out.push_str("<div class=\"actions\"><button type=\"submit\">Predict</button>\n");
    out.push_str("<button type=\"submit\" formaction=\"/refresh\" class=\"secondary\">Refresh metrics</button></div>\n");
    out.push_str("</form>\n</section>\n");
    out
}

/// Prediction value and the last failure, when present.
pub fn render_result(view: &DashboardView<'_>) -> String {
    let mut out = String::new();
    if let Some(value) = view.prediction {
        let _ = writeln!(
            out,
            "<section class=\"card result\"><p>Prediction Result: <strong id=\"prediction\">{}</strong></p></section>",
            format_number(value)
        );
    }
    if let Some(failure) = view.last_failure {
        let _ = writeln!(
            out,
            "<p class=\"diagnostic\">{} failed: {}</p>",
            failure.operation,
            escape(&failure.error.to_string())
        );
    }
    out
}

/// Bar chart of the distribution, one bar per label, scaled to the largest
/// count.
pub fn render_distribution(metrics: &MetricsSnapshot) -> String {
    let mut out = String::new();
    out.push_str("<section class=\"card\">\n<h2>Prediction Distribution</h2>\n<div class=\"chart\">\n");
    let max = metrics.max_count();
    for (label, count) in metrics.ordered_distribution() {
        let pct = if max == 0 {
            0.0
        } else {
            count as f64 / max as f64 * 100.0
        };
        let _ = writeln!(
            out,
            "<div class=\"bar-group\" data-label=\"{label}\" data-count=\"{count}\"><span class=\"count\">{count}</span><div class=\"bar\" style=\"height: {pct:.1}%\"></div><span class=\"bar-label\">{label}</span></div>",
            label = escape(label),
        );
    }
    out.push_str("</div>\n</section>\n");
    out
}

/// Recent-request log in server order, or the empty-state item.
pub fn render_log(metrics: &MetricsSnapshot) -> String {
    let mut out = String::new();
    out.push_str("<section class=\"card\">\n<h2>Recent Logs</h2>\n<ul class=\"log\">\n");
    if metrics.log.is_empty() {
        let _ = writeln!(out, "<li class=\"empty\">{EMPTY_LOG}</li>");
    }
    for entry in &metrics.log {
        let _ = writeln!(
            out,
            "<li><strong>{}</strong>: Predicted <b>{}</b> for input: {}</li>",
            escape(&entry.timestamp.to_string()),
            format_number(entry.prediction),
            format_input(&entry.input)
        );
    }
    out.push_str("</ul>\n</section>\n");
    out
}

/// Minimal HTML escaping for text and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const HEAD: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>ML Prediction Dashboard</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}
* { margin: 0; padding: 0; box-sizing: border-box; }
body { background: var(--bg); color: var(--text); font-family: var(--font); font-size: 14px; line-height: 1.5; }
.app { max-width: 900px; margin: 0 auto; padding: 24px; }
header { margin-bottom: 24px; padding-bottom: 16px; border-bottom: 1px solid var(--border); }
header h1 { font-size: 24px; font-weight: 600; }
.card { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 20px; margin-bottom: 16px; }
.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 16px; }
input { background: var(--bg); color: var(--text); border: 1px solid var(--border); border-radius: 6px; padding: 6px 10px; margin: 5px; font-family: var(--mono); width: 120px; }
input.invalid { border-color: var(--yellow); }
.actions { margin-top: 10px; display: flex; gap: 8px; }
button { padding: 8px 16px; border: none; border-radius: 6px; background: var(--accent); color: #fff; font-weight: 500; cursor: pointer; }
button.secondary { background: transparent; border: 1px solid var(--border); color: var(--text-muted); }
.result strong { font-family: var(--mono); font-size: 20px; color: var(--green); }
.diagnostic { color: var(--red); margin-bottom: 16px; font-size: 12px; }
.chart { display: flex; align-items: flex-end; gap: 8px; height: 180px; padding-top: 20px; }
.chart .bar-group { flex: 1; display: flex; flex-direction: column; align-items: center; height: 100%; justify-content: flex-end; }
.chart .bar { width: 100%; max-width: 48px; background: var(--accent); border-radius: 3px 3px 0 0; min-height: 2px; }
.chart .count { font-size: 11px; color: var(--text-muted); margin-bottom: 4px; font-family: var(--mono); }
.chart .bar-label { font-size: 11px; color: var(--text-muted); margin-top: 6px; }
.log { list-style: none; }
.log li { padding: 6px 0; border-bottom: 1px solid var(--border); font-size: 13px; }
.log li.empty { color: var(--text-muted); }
</style>
</head>
<body>
<div class="app">
<header><h1>ML Prediction Dashboard</h1></header>
"##;

const TAIL: &str = "</div>\n</body>\n</html>\n";
