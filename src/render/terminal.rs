//! Colored terminal rendering of the dashboard.

use std::fmt::Write;

use colored::Colorize;

use super::{DashboardView, EMPTY_LOG, format_input, format_number};
use crate::client::MetricsSnapshot;

/// Width of the longest bar in the distribution chart.
const BAR_WIDTH: usize = 40;

/// Render the whole dashboard.
pub fn render(view: &DashboardView<'_>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "ML Prediction Dashboard".bold().cyan());
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(out);

    out.push_str(&render_features(view));
    let _ = writeln!(out);

    match view.prediction {
        Some(value) => {
            let _ = writeln!(
                out,
                "  {} {}",
                "Prediction:".bold(),
                format_number(value).green().bold()
            );
        }
        None => {
            let _ = writeln!(out, "  {} {}", "Prediction:".bold(), "none yet".dimmed());
        }
    }

    if let Some(failure) = view.last_failure {
        let _ = writeln!(
            out,
            "  {} {} failed: {}",
            "!".red().bold(),
            failure.operation,
            failure.error
        );
    }

    if let Some(metrics) = view.metrics {
        let _ = writeln!(out);
        out.push_str(&render_metrics(metrics));
    }

    out
}

/// One line per slot: index, raw text, and a marker for non-numeric text.
pub fn render_features(view: &DashboardView<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Features".bold().cyan());
    for (i, raw) in view.features.iter().enumerate() {
        let shown = if raw.is_empty() {
            format!("Feature {}", i + 1).dimmed().to_string()
        } else {
            raw.clone()
        };
        let marker = if view.invalid_slots.contains(&i) && !raw.is_empty() {
            " (not a number)".yellow().to_string()
        } else {
            String::new()
        };
        let _ = writeln!(out, "  [{i}] {shown}{marker}");
    }
    out
}

/// Distribution chart followed by the recent-request log.
pub fn render_metrics(metrics: &MetricsSnapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Prediction Distribution".bold().cyan());
    let max = metrics.max_count();
    let entries = metrics.ordered_distribution();
    let label_width = entries.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    if entries.is_empty() {
        let _ = writeln!(out, "  {}", "No predictions yet.".dimmed());
    }
    for (label, count) in entries {
        let _ = writeln!(
            out,
            "  {:<width$} {} {}",
            label,
            bar(count, max).blue(),
            count,
            width = label_width
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Recent Logs".bold().cyan());
    if metrics.log.is_empty() {
        let _ = writeln!(out, "  {}", EMPTY_LOG.dimmed());
    }
    for entry in &metrics.log {
        let _ = writeln!(
            out,
            "  {}: Predicted {} for input: {}",
            entry.timestamp.to_string().bold(),
            format_number(entry.prediction).bold(),
            format_input(&entry.input)
        );
    }

    out
}

/// Bar of `count` scaled against `max`. Non-zero counts always get at least
/// one cell.
fn bar(count: u64, max: u64) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let cells = ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(cells.max(1))
}
