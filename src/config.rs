//! Analysis configuration
//!
//! Read from an optional TOML file (`--config`, `GMAO_CONFIG`, or
//! `gmao.toml` in the working directory). A missing file means defaults:
//!
//! ```toml
//! [thermal]
//! design_efficiency = 85.0
//! degradation_method = "endpoints"   # or "least_squares"
//!
//! [history]
//! months = 12
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::reliability::MAX_HISTORY_MONTHS;
use crate::thermal::ThermalSettings;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub months: u32,
}

impl Default for HistorySettings {
    fn default() -> Self {
        HistorySettings { months: 12 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub thermal: ThermalSettings,
    pub history: HistorySettings,
}

impl AnalysisConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        design_efficiency(self.thermal.design_efficiency)?;
        history_months(self.history.months)?;
        Ok(())
    }
}

/// Check a design efficiency in percent, from the config file or the command line
pub fn design_efficiency(value: f64) -> Result<f64, ConfigError> {
    if value > 0.0 && value <= 100.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(format!(
            "design efficiency must be in (0, 100], got {value}"
        )))
    }
}

pub fn history_months(value: u32) -> Result<u32, ConfigError> {
    if (1..=MAX_HISTORY_MONTHS).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(format!(
            "history months must be between 1 and {MAX_HISTORY_MONTHS}, got {value}"
        )))
    }
}

/// Load the configuration at `path`, or defaults when it does not exist
pub fn load_config(path: &Path) -> Result<AnalysisConfig, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(AnalysisConfig::default());
    }

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = AnalysisConfig::from_toml(&text)?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}
