use anyhow::Result;
use clap::{Parser, Subcommand};

use predictboard::cli;

#[derive(Debug, Parser)]
#[command(name = "predictboard")]
#[command(about = "Submit feature vectors to a prediction service and watch its metrics")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fill the feature form, predict once, and print the dashboard
    Predict {
        /// Feature values in slot order; missing slots stay empty
        #[arg(required = true, allow_hyphen_values = true)]
        values: Vec<String>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Fetch and print the prediction distribution and recent log
    Metrics {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Interactive session: edit slots, predict, refresh
    Shell,
    /// Run the local web dashboard
    Serve {
        /// Bind address (default from config: 127.0.0.1:9747)
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser
        #[arg(long)]
        no_open: bool,
    },
    /// Check config, service reachability, and recent request failures
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default config to ~/.predictboard/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set one dotted key, e.g. `service.base_url`
    Set { key: String, value: String },
    /// Overwrite the global config with defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Predict { values, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_predict(&values, fmt)
        }
        Commands::Metrics { format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_metrics(fmt)
        }
        Commands::Shell => cli::run_shell(),
        Commands::Serve { addr, no_open } => cli::run_serve(addr, no_open),
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
