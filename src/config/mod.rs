//! Typed configuration from a TOML file and environment variables.
//!
//! Environment variables win over the file. In local dev, call
//! `dotenvy::dotenv().ok()` first to pick up a `.env` file.
//!
//! | Variable          | Key              | Default |
//! |-------------------|------------------|---------|
//! | `WORKLIST_DIR`    | `definition_dir` | `.`     |
//! | `WORKLIST_FORMAT` | `format`         | `xml`   |
//! | `OTEL_ENDPOINT`   | `otel_endpoint`  | unset   |
//! | `LOG_LEVEL`       | `log_level`      | `info`  |

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::definition::{WorkListKind, definition_path};
use crate::error::{Error, Result};
use crate::store::StoreFormat;
use crate::telemetry::TelemetryConfig;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory definition files are created in.
    pub definition_dir: PathBuf,
    pub format: StoreFormat,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            definition_dir: PathBuf::from("."),
            format: StoreFormat::default(),
            otel_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(env_var)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read config {}: {e}", path.display())))?;
        Self::from_toml(&text)
            .map_err(|e| Error::Config(format!("bad config {}: {e}", path.display())))?
            .with_overrides(env_var)
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup("WORKLIST_DIR") {
            self.definition_dir = PathBuf::from(dir);
        }
        if let Some(format) = lookup("WORKLIST_FORMAT") {
            self.format = format.parse().map_err(Error::Config)?;
        }
        if let Some(endpoint) = lookup("OTEL_ENDPOINT") {
            self.otel_endpoint = Some(endpoint).filter(|e| !e.is_empty());
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(self)
    }

    /// Where a new work list of `kind` named `name` is stored.
    pub fn definition_path(&self, name: &str, kind: WorkListKind) -> PathBuf {
        definition_path(&self.definition_dir, name, kind)
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            endpoint: self.otel_endpoint.clone(),
            service_name: "worklist".to_string(),
            log_level: self.log_level.clone(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
