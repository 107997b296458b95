/// Configuration schema and defaults for predictboard.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[service]`, `[form]`, `[web]` and `[logging]`.
///
/// Every field has a sensible built-in default. Users only need to set the
/// values they want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level predictboard configuration.
///
/// Maps directly to the `~/.predictboard/config.toml` and
/// `.predictboard.toml` file schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub service: ServiceConfig,
    pub form: FormConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [service]
// ---------------------------------------------------------------------------

/// Remote prediction service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Origin that serves `POST /predict` and `GET /metrics`.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [form]
// ---------------------------------------------------------------------------

/// Feature form settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Number of feature slots shown in the form.
    pub arity: usize,
    /// Refuse to submit when a slot does not parse as a finite number.
    /// When `false`, such slots are sent as `null`.
    pub strict: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            arity: 4,
            strict: false,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Local dashboard server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub addr: String,
    /// Try to open the dashboard in the system browser on `serve`.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Stderr verbosity for request diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
        }
    }
}

/// Request log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether the JSONL request log is written.
    pub enabled: bool,
    /// Path to the request log file. `~` is expanded to the home directory.
    pub path: String,
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.predictboard/requests.jsonl".to_string(),
            level: LogLevel::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML
// ---------------------------------------------------------------------------

impl BoardConfig {
    /// Annotated default config written by `predictboard config init`.
    pub fn default_toml() -> &'static str {
        DEFAULT_CONFIG_TOML
    }
}

const DEFAULT_CONFIG_TOML: &str = r#"# predictboard configuration
#
# Precedence (highest last): built-in defaults, this file,
# .predictboard.toml in the working directory, PREDICTBOARD_* env vars.

[service]
# Origin serving POST /predict and GET /metrics.
base_url = "http://127.0.0.1:8000"
timeout_ms = 10000

[form]
# Number of feature inputs.
arity = 4
# Refuse to submit non-numeric slots instead of sending them as null.
strict = false

[web]
addr = "127.0.0.1:9747"
open_browser = true

[logging]
enabled = true
path = "~/.predictboard/requests.jsonl"
# error | warn | info | debug
level = "warn"
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
