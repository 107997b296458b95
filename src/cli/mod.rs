//! CLI command implementations for predictboard.
//!
//! Provides subcommand handlers for:
//! - `predictboard predict <values...>`: one-shot prediction + metrics
//! - `predictboard metrics`: fetch and print the metrics snapshot
//! - `predictboard shell`: interactive edit/predict loop
//! - `predictboard serve`: local web dashboard
//! - `predictboard health`: config sources, service reachability, request log
//! - `predictboard config show|init|set|reset`: configuration management

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::client::{
    MetricsClient, MetricsService, MetricsSnapshot, PredictionClient, PredictionService,
};
use crate::config::{self, BoardConfig};
use crate::controller::{Dashboard, PredictOutcome, RefreshOutcome};
use crate::diagnostics::{self, Reporter};
use crate::render::{format_input, format_number, terminal};
use crate::web;

/// Output format for data commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Controller wired to the real HTTP clients.
pub type LiveDashboard = Dashboard<PredictionClient, MetricsClient>;

/// Build a controller from the resolved config. No request is made.
pub fn build_dashboard(cfg: &BoardConfig) -> LiveDashboard {
    let (predictor, metrics) = live_clients(cfg);
    Dashboard::new(cfg.form.arity, predictor, metrics).with_strict(cfg.form.strict)
}

/// Build a controller and run its initial Metrics-Refresh.
pub fn start_dashboard(cfg: &BoardConfig) -> (LiveDashboard, RefreshOutcome) {
    let (predictor, metrics) = live_clients(cfg);
    let (dashboard, initial) = Dashboard::start(cfg.form.arity, predictor, metrics);
    (dashboard.with_strict(cfg.form.strict), initial)
}

fn live_clients(cfg: &BoardConfig) -> (PredictionClient, MetricsClient) {
    let reporter = Reporter::from_config(&cfg.logging);
    let predictor = PredictionClient::from_config(&cfg.service).with_reporter(reporter.clone());
    let metrics = MetricsClient::from_config(&cfg.service).with_reporter(reporter);
    (predictor, metrics)
}

// ---------------------------------------------------------------------------
// predictboard predict
// ---------------------------------------------------------------------------

/// Fill the form from `values`, predict, and print the resulting dashboard.
///
/// Fails (non-zero exit) when the prediction did not succeed.
pub fn run_predict(values: &[String], format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let mut dashboard = build_dashboard(&cfg);
    fill_form(&mut dashboard, values)?;

    let outcome = dashboard.predict();

    match format {
        OutputFormat::Json => print_outcome_json(&dashboard, &outcome)?,
        OutputFormat::Csv | OutputFormat::Table => print!("{}", terminal::render(&dashboard.view())),
    }

    match outcome {
        PredictOutcome::Predicted { .. } => Ok(()),
        PredictOutcome::Failed(e) => Err(anyhow::Error::new(e).context("prediction failed")),
        PredictOutcome::Rejected { slots } => {
            anyhow::bail!("refusing to submit non-numeric slots: {slots:?}")
        }
    }
}

/// Write `values` into the leading slots. Extra values are an error.
fn fill_form<P, M>(dashboard: &mut Dashboard<P, M>, values: &[String]) -> Result<()>
where
    P: PredictionService,
    M: MetricsService,
{
    if values.len() > dashboard.arity() {
        anyhow::bail!(
            "got {} values but the form has {} slots (set form.arity to change)",
            values.len(),
            dashboard.arity()
        );
    }
    for (i, value) in values.iter().enumerate() {
        dashboard.edit(i, value.as_str());
    }
    Ok(())
}

fn print_outcome_json(dashboard: &LiveDashboard, outcome: &PredictOutcome) -> Result<()> {
    let view = dashboard.view();
    let refresh = match outcome {
        PredictOutcome::Predicted { refresh, .. } => Some(match refresh {
            RefreshOutcome::Refreshed => "refreshed".to_string(),
            RefreshOutcome::Failed(e) => format!("failed: {e}"),
        }),
        _ => None,
    };
    let value = serde_json::json!({
        "features": view.features,
        "prediction": view.prediction,
        "refresh": refresh,
        "error": view.last_failure.map(|f| f.error.to_string()),
        "metrics": view.metrics,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// predictboard metrics
// ---------------------------------------------------------------------------

/// Fetch the metrics snapshot once and print it.
pub fn run_metrics(format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let client = MetricsClient::from_config(&cfg.service)
        .with_reporter(Reporter::from_config(&cfg.logging));
    let snapshot = client
        .fetch_metrics()
        .with_context(|| format!("failed to fetch metrics from {}", client.base_url()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Csv => print!("{}", metrics_csv(&snapshot)),
        OutputFormat::Table => print!("{}", terminal::render_metrics(&snapshot)),
    }

    Ok(())
}

fn metrics_csv(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::from("label,count\n");
    for (label, count) in snapshot.ordered_distribution() {
        out.push_str(&format!("{},{count}\n", csv_field(label)));
    }
    out.push_str("\ntimestamp,prediction,input\n");
    for entry in &snapshot.log {
        out.push_str(&format!(
            "{},{},{}\n",
            csv_field(&entry.timestamp.to_string()),
            format_number(entry.prediction),
            csv_field(&format_input(&entry.input))
        ));
    }
    out
}

/// Quote a CSV field when it contains a separator, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// predictboard shell
// ---------------------------------------------------------------------------

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Set { index: usize, value: String },
    Predict,
    Refresh,
    Show,
    Help,
    Quit,
}

/// Parse a shell line. Blank lines yield `Ok(None)`.
pub fn parse_shell_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let cmd = match word {
        "set" | "s" => {
            let (index, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let index = index
                .parse::<usize>()
                .map_err(|_| format!("expected a slot number, got '{index}'"))?;
            ShellCommand::Set {
                index,
                value: value.trim().to_string(),
            }
        }
        "predict" | "p" => ShellCommand::Predict,
        "refresh" | "r" => ShellCommand::Refresh,
        "show" => ShellCommand::Show,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };

    Ok(Some(cmd))
}

const SHELL_HELP: &str = "\
  set <i> <text>   edit feature slot i (0-based); empty text clears it
  predict          submit the form, then refresh metrics
  refresh          refresh metrics
  show             print the dashboard
  quit             leave";

/// Interactive loop over one dashboard session.
pub fn run_shell() -> Result<()> {
    let cfg = config::load();
    let (mut dashboard, _) = start_dashboard(&cfg);

    println!("{}", "predictboard shell".bold().cyan());
    println!("{SHELL_HELP}\n");
    print!("{}", terminal::render(&dashboard.view()));

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("{} ", ">".cyan());
        stdout.flush().context("failed to flush stdout")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("failed to read input")? == 0 {
            break;
        }

        let cmd = match parse_shell_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                println!("  {}", msg.yellow());
                continue;
            }
        };

        match cmd {
            ShellCommand::Set { index, value } => {
                if let Err(e) = dashboard.try_edit(index, value) {
                    println!("  {}", e.to_string().yellow());
                    continue;
                }
                print!("{}", terminal::render_features(&dashboard.view()));
            }
            ShellCommand::Predict => {
                if let PredictOutcome::Rejected { slots } = dashboard.predict() {
                    println!("  {} {slots:?}", "Not numeric:".yellow());
                }
                print!("{}", terminal::render(&dashboard.view()));
            }
            ShellCommand::Refresh => {
                dashboard.refresh_metrics();
                print!("{}", terminal::render(&dashboard.view()));
            }
            ShellCommand::Show => print!("{}", terminal::render(&dashboard.view())),
            ShellCommand::Help => println!("{SHELL_HELP}"),
            ShellCommand::Quit => break,
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// predictboard serve
// ---------------------------------------------------------------------------

/// Run the local web dashboard until interrupted.
pub fn run_serve(addr: Option<String>, no_open: bool) -> Result<()> {
    let cfg = config::load();
    let addr = addr.unwrap_or_else(|| cfg.web.addr.clone());
    let (mut dashboard, _) = start_dashboard(&cfg);

    println!(
        "  {} {}",
        "Service:".bold(),
        cfg.service.base_url.as_str().dimmed()
    );
    web::serve(&addr, &mut dashboard, cfg.web.open_browser && !no_open)
}

// ---------------------------------------------------------------------------
// predictboard health
// ---------------------------------------------------------------------------

/// Check config sources, service reachability and recent request failures.
pub fn run_health() -> Result<()> {
    println!("{}", "predictboard Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();

    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.predictboard/config.toml found"
        } else {
            "not found (run `predictboard config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".predictboard.toml found"
        } else {
            "none (optional)"
        },
    );
    print_health_item(
        "Form",
        true,
        &format!(
            "{} slots{}",
            cfg.form.arity,
            if cfg.form.strict { ", strict" } else { "" }
        ),
    );

    // Reachability is one metrics round-trip; it is not recorded in the log.
    let client = MetricsClient::from_config(&cfg.service);
    match client.fetch_metrics() {
        Ok(snapshot) => print_health_item(
            "Service",
            true,
            &format!(
                "reachable at {} ({} labels, {} log entries)",
                client.base_url(),
                snapshot.distribution.len(),
                snapshot.log.len()
            ),
        ),
        Err(e) => print_health_item(
            "Service",
            false,
            &format!("{}: {e}", client.base_url()),
        ),
    }

    let reporter = Reporter::from_config(&cfg.logging);
    match reporter.log_path() {
        Some(path) => {
            let recent = diagnostics::read_recent(path, 50);
            let failures = recent.iter().filter(|r| !r.success).count();
            print_health_item(
                "Request log",
                failures == 0,
                &if recent.is_empty() {
                    "no requests logged yet".to_string()
                } else {
                    format!("{failures} failures in last {} requests", recent.len())
                },
            );
            if let Some(last) = recent.iter().rev().find(|r| !r.success) {
                println!(
                    "    {} {} {} {}",
                    "last failure:".dimmed(),
                    last.timestamp.dimmed(),
                    last.operation,
                    last.error.as_deref().unwrap_or("").dimmed()
                );
            }
        }
        None => print_health_item("Request log", true, "disabled"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<16} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// predictboard config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective predictboard Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.predictboard/config.toml", global_exists);
    print_source(".predictboard.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "PREDICTBOARD_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.predictboard/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
