//! Presentation layer.
//!
//! Renderers are pure functions of a [`DashboardView`]: they hold no state
//! and never touch the network. [`terminal`] produces colored text for the
//! CLI front-ends, [`html`] produces the web dashboard page.

pub mod html;
pub mod terminal;

pub use crate::controller::DashboardView;

/// Text shown in place of an empty log.
pub const EMPTY_LOG: &str = "No predictions logged yet.";

/// Format a number the way the service's JSON shows it: integers without a
/// fractional part, non-finite values as `null`.
pub fn format_number(value: f64) -> String {
    if value.is_finite() {
        format!("{value}")
    } else {
        "null".to_string()
    }
}

/// Format a logged feature vector as a compact JSON-style array.
pub fn format_input(input: &[Option<f64>]) -> String {
    let parts: Vec<String> = input
        .iter()
        .map(|v| v.map_or_else(|| "null".to_string(), format_number))
        .collect();
    format!("[{}]", parts.join(","))
}
