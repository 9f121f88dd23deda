//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::types::DEFAULT_CURRENCY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Max stages evaluated concurrently within one topological wave.
    pub max_parallel_tasks: usize,

    /// Rows kept in the preview sample of a run result.
    pub preview_rows: usize,

    /// Currency used for money values whose declared type names none.
    pub default_currency: String,

    /// Root directory of the filesystem catalog (CLI only).
    pub data_dir: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel_tasks: 4,
            preview_rows: 50,
            default_currency: DEFAULT_CURRENCY.to_string(),
            data_dir: None,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TABFLOW_MAX_PARALLEL_TASKS`: max concurrent stages
    /// - `TABFLOW_PREVIEW_ROWS`: preview sample size
    /// - `TABFLOW_DEFAULT_CURRENCY`: fallback currency code
    /// - `TABFLOW_DATA_DIR`: filesystem catalog root
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("TABFLOW_MAX_PARALLEL_TASKS").and_then(|s| s.parse::<usize>().ok()) {
            cfg.max_parallel_tasks = v.max(1);
        }

        if let Some(v) = lookup("TABFLOW_PREVIEW_ROWS").and_then(|s| s.parse::<usize>().ok()) {
            cfg.preview_rows = v;
        }

        if let Some(s) = lookup("TABFLOW_DEFAULT_CURRENCY") {
            let s = s.trim();
            if !s.is_empty() {
                cfg.default_currency = s.to_ascii_uppercase();
            }
        }

        if let Some(s) = lookup("TABFLOW_DATA_DIR") {
            if !s.trim().is_empty() {
                cfg.data_dir = Some(s);
            }
        }

        cfg
    }
}
