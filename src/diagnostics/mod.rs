//! Request diagnostics.
//!
//! Every client round-trip produces one [`RequestRecord`]. The [`Reporter`]
//! appends it as a JSON line to the request log (`~/.predictboard/requests.jsonl`
//! by default) and echoes it on stderr according to the configured level.
//! Writing diagnostics never fails the caller.

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::client::ClientError;
use crate::config;
use crate::config::schema::{LogLevel, LoggingConfig};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Which endpoint a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Predict,
    Metrics,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Predict => write!(f, "predict"),
            Self::Metrics => write!(f, "metrics"),
        }
    }
}

/// A single entry in the request log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub timestamp: String,
    pub operation: Operation,
    pub success: bool,
    pub latency_ms: u64,
    /// HTTP status, only set for service failures.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<u16>,
    /// Error kind (`network`, `service`, `malformed`).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl RequestRecord {
    pub fn success(operation: Operation, latency_ms: u64) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            operation,
            success: true,
            latency_ms,
            status: None,
            kind: None,
            error: None,
        }
    }

    pub fn failure(operation: Operation, latency_ms: u64, err: &ClientError) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            operation,
            success: false,
            latency_ms,
            status: err.status(),
            kind: Some(err.kind().to_string()),
            error: Some(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Sink for request records.
#[derive(Debug, Clone)]
pub struct Reporter {
    level: LogLevel,
    /// `None` disables the JSONL log.
    log_path: Option<PathBuf>,
    /// `false` suppresses stderr output entirely.
    stderr: bool,
}

impl Reporter {
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            level: config.level,
            log_path: if config.enabled {
                config::expand_home(&config.path)
            } else {
                None
            },
            stderr: true,
        }
    }

    /// A reporter that drops every record.
    pub fn silent() -> Self {
        Self {
            level: LogLevel::Error,
            log_path: None,
            stderr: false,
        }
    }

    pub fn log_path(&self) -> Option<&PathBuf> {
        self.log_path.as_ref()
    }

    pub fn record(&self, record: &RequestRecord) {
        if let Some(line) = self.stderr_line(record) {
            eprintln!("{line}");
        }
        if let Some(path) = &self.log_path {
            let _ = append_record(path, record);
        }
    }

    /// Line echoed on stderr for `record`, if the level admits it.
    fn stderr_line(&self, record: &RequestRecord) -> Option<String> {
        if !self.stderr {
            return None;
        }
        if record.success {
            if self.level < LogLevel::Info {
                return None;
            }
            return Some(format!(
                "[predictboard] {} ok ({} ms)",
                record.operation, record.latency_ms
            ));
        }
        if self.level < LogLevel::Warn {
            return None;
        }
        Some(format!(
            "[predictboard] {} failed: {}",
            record.operation,
            record.error.as_deref().unwrap_or("unknown error")
        ))
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

fn append_record(path: &PathBuf, record: &RequestRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(record)?;
    writeln!(file, "{json}")?;

    Ok(())
}

/// Read the last `n` records from the request log.
///
/// Silently skips malformed lines. Returns an empty vec if the file does not
/// exist or cannot be read.
pub fn read_recent(path: &PathBuf, n: usize) -> Vec<RequestRecord> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    let records: Vec<RequestRecord> = BufReader::new(file)
        .lines()
        .map_while(|line| line.ok())
        .filter_map(|line| serde_json::from_str::<RequestRecord>(&line).ok())
        .collect();

    let skip = records.len().saturating_sub(n);
    records.into_iter().skip(skip).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
