//! Optional TOML configuration file.
//!
//! ```toml
//! [model]
//! changepoint_prior_scale = 0.1
//! yearly_seasonality = true
//!
//! [run]
//! regressors = ["meteo_temp", "festivo"]
//! horizon = 60
//! ```
//!
//! Every key is optional; command-line flags override file values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::ModelConfig;
use crate::error::AppError;

/// Run defaults that may be set in the `[run]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunDefaults {
    pub target: Option<String>,
    pub regressors: Option<Vec<String>>,
    pub horizon: Option<u32>,
    pub table_margin: Option<usize>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub model: ModelConfig,
    pub run: RunDefaults,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("Failed to read config '{}': {e}", path.display())))?;
        let config = Self::from_toml(&content)
            .map_err(|e| AppError::config(format!("{} ({})", e.message(), path.display())))?;
        tracing::info!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, AppError> {
        let config: Self =
            toml::from_str(content).map_err(|e| AppError::config(format!("Invalid config TOML: {e}")))?;
        config.model.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(ConfigFile::from_toml("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let cfg = ConfigFile::from_toml(
            "[model]\nchangepoint_prior_scale = 0.3\nyearly_seasonality = true\n\n[run]\nhorizon = 60\n",
        )
        .unwrap();
        assert_eq!(cfg.model.changepoint_prior_scale, 0.3);
        assert!(cfg.model.yearly_seasonality);
        assert_eq!(cfg.model.weekly_order, 3);
        assert_eq!(cfg.run.horizon, Some(60));
        assert_eq!(cfg.run.regressors, None);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_config_errors() {
        let err = ConfigFile::from_toml("[model]\nchangepoints = 3\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = ConfigFile::from_toml("[model]\ninterval_width = 1.5\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demand.toml");
        std::fs::write(&path, "[run]\nregressors = [\"festivo\"]\n").unwrap();
        let cfg = ConfigFile::from_file(&path).unwrap();
        assert_eq!(cfg.run.regressors, Some(vec!["festivo".to_string()]));
    }
}
