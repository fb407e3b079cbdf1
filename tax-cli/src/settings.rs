//! Settings file loader.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "deductions.db"
//!
//! [deductions]
//! personal_exemption = 60000
//! personal_upper_limit = 100000
//! donation_upper_limit = 100000
//! k_receipt_upper_limit = 50000
//!
//! [logging]
//! level = "info"
//! file = "tax-cli.log"
//! ```
//!
//! Every section and key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tax_core::DeductionConfig;
use tax_core::db::DbConfig;
use tracing::debug;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_SETTINGS_FILENAME: &str = "tax-cli.toml";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppSettings {
    pub database: DbConfig,
    pub deductions: DeductionConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Bare level or full filter directive, e.g. `debug` or `tax_core=trace`.
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl AppSettings {
    /// Parses settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse settings")
    }

    /// Loads settings from `path`, or from [`DEFAULT_SETTINGS_FILENAME`] if it
    /// exists, or falls back to defaults.
    ///
    /// An explicitly named file that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings_path = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Settings file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => {
                let default = PathBuf::from(DEFAULT_SETTINGS_FILENAME);
                if !default.exists() {
                    debug!("no settings file, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&settings_path)
            .with_context(|| format!("Failed to read settings file '{}'", settings_path.display()))?;
        let settings = Self::from_toml(&text)
            .with_context(|| format!("Invalid settings file '{}'", settings_path.display()))?;
        debug!(path = %settings_path.display(), "loaded settings");
        Ok(settings)
    }
}
