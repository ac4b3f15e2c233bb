//! Causal group configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Environment variable overriding [`GroupConfig::log_filter`].
pub const LOG_ENV: &str = "CAUSAL_GROUP_LOG";

/// Configuration shared by every group created from it.
///
/// Travels with a group identity through merges; the surviving side's
/// configuration wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Number of observed signal names shown in full by `Display` before
    /// the list is abbreviated.
    pub display_signal_limit: usize,

    /// Run the reference sanity check after every merge and log mismatches.
    pub verify_merges: bool,

    /// `tracing` filter directive used by [`crate::telemetry::init_tracing`].
    pub log_filter: String,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            display_signal_limit: 4,
            verify_merges: false,
            log_filter: "info".into(),
        }
    }
}

impl GroupConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(mut self) -> Self {
        if let Ok(filter) = std::env::var(LOG_ENV) {
            if !filter.trim().is_empty() {
                self.log_filter = filter;
            }
        }
        self
    }
}
