//! Configuration loading for the standalone binary

use anyhow::{bail, Context, Result};

use crate::state::{ChangeDetection, FusionOptions};

/// Log verbosity, 0 (warnings only) to 3 (every sample)
pub const VERBOSITY_VAR: &str = "MINDSTATE_VERBOSITY";

/// Set to `1`/`true` to notify only when the final state differs
pub const STRICT_CHANGES_VAR: &str = "MINDSTATE_STRICT_CHANGES";

/// Power threshold used by the binary
pub const CLI_THRESHOLD: f64 = 0.0;

/// Binary configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Log verbosity level
    pub verbosity: u8,

    /// Change detection used by the reducer
    pub change_detection: ChangeDetection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: 1,
            change_detection: ChangeDetection::AnyFieldTouched,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_vars(
            std::env::var(VERBOSITY_VAR).ok(),
            std::env::var(STRICT_CHANGES_VAR).ok(),
        )
    }

    /// Build a configuration from raw variable values
    pub fn from_vars(verbosity: Option<String>, strict_changes: Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = verbosity {
            config.verbosity = raw
                .trim()
                .parse()
                .with_context(|| format!("{VERBOSITY_VAR} must be a number, got {raw:?}"))?;
        }

        if let Some(raw) = strict_changes {
            config.change_detection = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => ChangeDetection::FinalDiff,
                "0" | "false" | "no" | "off" | "" => ChangeDetection::AnyFieldTouched,
                other => bail!("{STRICT_CHANGES_VAR} must be a boolean, got {other:?}"),
            };
        }

        Ok(config)
    }

    /// Default log filter for the configured verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Reduction options for the binary's session
    pub fn fusion_options(&self) -> FusionOptions {
        FusionOptions::new(CLI_THRESHOLD).with_change_detection(self.change_detection)
    }
}
