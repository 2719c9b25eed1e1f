//! Session configuration.
//!
//! ```toml
//! default_schema = "app"
//! connective_mode = "verbatim"
//! log_sql = true
//! max_logged_sql_length = 500
//! ```

use crate::error::{QbError, QbResult};
use crate::predicate::ConnectiveMode;
use serde::Deserialize;
use std::path::Path;

/// Configuration for a [`Db`](crate::Db) session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QbConfig {
    /// Schema consulted by `schema`, `has_table` and `has_columns`.
    pub default_schema: String,
    /// How WHERE predicates without an explicit connective are joined.
    pub connective_mode: ConnectiveMode,
    /// Log every executed statement at DEBUG on target `pgqb.sql`.
    pub log_sql: bool,
    /// Truncate logged SQL to this many bytes; `None` logs it whole.
    pub max_logged_sql_length: Option<usize>,
}

impl Default for QbConfig {
    fn default() -> Self {
        Self {
            default_schema: "public".to_string(),
            connective_mode: ConnectiveMode::default(),
            log_sql: true,
            max_logged_sql_length: Some(200),
        }
    }
}

impl QbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    pub fn connective_mode(mut self, mode: ConnectiveMode) -> Self {
        self.connective_mode = mode;
        self
    }

    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn max_logged_sql_length(mut self, max: Option<usize>) -> Self {
        self.max_logged_sql_length = max;
        self
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> QbResult<Self> {
        toml::from_str(s).map_err(|e| QbError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> QbResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| QbError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
