/// Configuration system for predictboard.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::BoardConfig::default()`]
/// 2. **User global config**: `~/.predictboard/config.toml`
/// 3. **Project local config**: `.predictboard.toml` in the current directory
/// 4. **Environment variables**: `PREDICTBOARD_*` overrides (highest precedence)
///
/// Later layers override earlier ones key by key. A file that sets only
/// `[form] arity` leaves every other value from the layers below it intact.
///
/// The service origin is only ever read from here; no module hardcodes it.
///
/// # Usage
///
/// ```rust,ignore
/// use predictboard::config;
///
/// let cfg = config::load();
/// let client = PredictionClient::from_config(&cfg.service);
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::BoardConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars, then normalizes values that would make the form unusable.
pub fn load() -> BoardConfig {
    let mut config = load_files(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    normalize(&mut config);
    config
}

/// Merge the given TOML files over the built-in defaults, in order.
fn load_files(paths: &[Option<PathBuf>]) -> BoardConfig {
    let defaults = BoardConfig::default();
    let Ok(mut merged) = toml::Value::try_from(&defaults) else {
        return defaults;
    };

    for layer in paths.iter().filter_map(|p| load_toml_file(p.as_deref())) {
        merge_config(&mut merged, layer);
    }

    merged.try_into().unwrap_or(defaults)
}

/// Load a TOML config file from the given path (if it exists).
///
/// Returns `None` if the path is `None`, the file doesn't exist, or the
/// content is malformed. A broken file is skipped; it never stops the
/// dashboard from starting with the remaining layers.
fn load_toml_file(path: Option<&Path>) -> Option<toml::Value> {
    let content = fs::read_to_string(path?).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    // Reject files whose keys have the wrong types before they are merged.
    value.clone().try_into::<BoardConfig>().ok()?;
    Some(value)
}

/// Merge a loaded config layer into the base, key by key.
///
/// Tables merge recursively; any other value in the overlay replaces the
/// base value. Keys absent from the overlay keep the base value.
fn merge_config(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_config(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Clamp values into their usable range.
fn normalize(config: &mut BoardConfig) {
    if config.form.arity == 0 {
        config.form.arity = 1;
    }
    let trimmed = config.service.base_url.trim_end_matches('/');
    if trimmed.len() != config.service.base_url.len() {
        config.service.base_url = trimmed.to_string();
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".predictboard").join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".predictboard.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `PREDICTBOARD_URL`: service origin
/// - `PREDICTBOARD_TIMEOUT_MS`: request timeout
/// - `PREDICTBOARD_ARITY`: number of feature slots
/// - `PREDICTBOARD_STRICT`: refuse non-numeric submissions (`1`/`true`)
/// - `PREDICTBOARD_WEB_ADDR`: dashboard bind address
/// - `PREDICTBOARD_LOG`: request log enabled (`1`/`true`)
/// - `PREDICTBOARD_LOG_LEVEL`: `error`, `warn`, `info`, `debug`
fn apply_env_overrides(config: &mut BoardConfig) {
    if let Ok(val) = std::env::var("PREDICTBOARD_URL")
        && !val.is_empty()
    {
        config.service.base_url = val;
    }
    if let Ok(val) = std::env::var("PREDICTBOARD_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.service.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("PREDICTBOARD_ARITY")
        && let Ok(arity) = val.parse::<usize>()
    {
        config.form.arity = arity;
    }
    if let Ok(val) = std::env::var("PREDICTBOARD_STRICT") {
        config.form.strict = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("PREDICTBOARD_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Ok(val) = std::env::var("PREDICTBOARD_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("PREDICTBOARD_LOG_LEVEL")
        && let Some(level) = parse_level(&val)
    {
        config.logging.level = level;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_level(val: &str) -> Option<schema::LogLevel> {
    match val.to_ascii_lowercase().as_str() {
        "error" => Some(schema::LogLevel::Error),
        "warn" | "warning" => Some(schema::LogLevel::Warn),
        "info" => Some(schema::LogLevel::Info),
        "debug" => Some(schema::LogLevel::Debug),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.predictboard/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.predictboard/ directory")?;
    }

    fs::write(&path, BoardConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `service.base_url`. The new value is parsed
/// according to the type of the value it replaces.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let base = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&BoardConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value = toml::from_str(&base).context("failed to parse config as TOML")?;
    set_toml_value(&mut root, key, value)?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table for '{key}'"))?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key: '{key}'"),
    };

    table.insert((*leaf).to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
