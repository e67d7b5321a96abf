/// Dataset configuration.
///
/// Configuration is read from a TOML file (default `cropnet.toml`) naming
/// the base directory of each modality, the weather variables to align, the
/// crop type, how the collator treats failed samples, and logging options.
/// A `.env` file may set `CROPNET_CONFIG` (config path) and
/// `CROPNET_BASE_DIR` (prefix applied to relative base directories).
///
/// ```toml
/// hrrr_dir = "WRF-HRRR Computed Dataset/data"
/// sentinel_dir = "Sentinel-2 Imagery/data"
/// usda_dir = "USDA Crop Dataset/data"
/// crop_type = "Soybeans"
/// failure_policy = "skip"
///
/// [log]
/// level = "info"
/// file = "cropnet_align.log"
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{LogLevel, init_logger};
use crate::model::{AlignError, Result};
use crate::variables::{CropType, default_weather_variables};

pub const DEFAULT_CONFIG_PATH: &str = "cropnet.toml";
pub const ENV_CONFIG_PATH: &str = "CROPNET_CONFIG";
pub const ENV_BASE_DIR: &str = "CROPNET_BASE_DIR";

/// What the collator does when one sample fails to align.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole batch on the first failed sample.
    #[default]
    Abort,
    /// Log the failure and leave the sample out of the batch.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub timestamps: bool,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            file: None,
            timestamps: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub hrrr_dir: PathBuf,
    pub sentinel_dir: PathBuf,
    pub usda_dir: PathBuf,
    #[serde(default = "default_weather_variables")]
    pub weather_variables: Vec<String>,
    #[serde(default)]
    pub crop_type: CropType,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            hrrr_dir: PathBuf::from("WRF-HRRR Computed Dataset/data"),
            sentinel_dir: PathBuf::from("Sentinel-2 Imagery/data"),
            usda_dir: PathBuf::from("USDA Crop Dataset/data"),
            weather_variables: default_weather_variables(),
            crop_type: CropType::default(),
            failure_policy: FailurePolicy::default(),
            log: LogConfig::default(),
        }
    }
}

impl DatasetConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: DatasetConfig =
            toml::from_str(text).map_err(|e| AlignError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| AlignError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Loads configuration using `.env` and environment overrides.
    ///
    /// Falls back to defaults when no config file exists at the resolved path.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let path = env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = Path::new(&path);
        let config = if path.exists() {
            Self::load(path)?
        } else {
            DatasetConfig::default()
        };

        Ok(match env::var(ENV_BASE_DIR) {
            Ok(base) => config.with_base_dir(Path::new(&base)),
            Err(_) => config,
        })
    }

    /// Prefixes relative modality directories with `base`.
    pub fn with_base_dir(mut self, base: &Path) -> Self {
        for dir in [&mut self.hrrr_dir, &mut self.sentinel_dir, &mut self.usda_dir] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.weather_variables.is_empty() {
            return Err(AlignError::Config("weather_variables must not be empty".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for name in &self.weather_variables {
            if !seen.insert(name.trim()) {
                return Err(AlignError::Config(format!("duplicate weather variable '{}'", name)));
            }
        }
        Ok(())
    }

    /// Initialises the global logger from the `[log]` section.
    pub fn init_logging(&self) {
        init_logger(self.log.level, self.log.file.as_deref(), self.log.timestamps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = DatasetConfig::from_toml_str(
            r#"
            hrrr_dir = "hrrr"
            sentinel_dir = "sentinel"
            usda_dir = "usda"
            "#,
        )
        .unwrap();
        assert_eq!(config.weather_variables.len(), 9);
        assert_eq!(config.crop_type, CropType::Soybeans);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_full_config() {
        let config = DatasetConfig::from_toml_str(
            r#"
            hrrr_dir = "/mnt/cropnet/hrrr"
            sentinel_dir = "/mnt/cropnet/sentinel"
            usda_dir = "/mnt/cropnet/usda"
            weather_variables = ["Avg Temperature (K)", "Precipitation (kg m**-2)"]
            crop_type = "Winter Wheat"
            failure_policy = "skip"

            [log]
            level = "debug"
            file = "align.log"
            timestamps = true
            "#,
        )
        .unwrap();
        assert_eq!(config.weather_variables.len(), 2);
        assert_eq!(config.crop_type, CropType::WinterWheat);
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.log.file.as_deref(), Some("align.log"));
        assert!(config.log.timestamps);
    }

    #[test]
    fn test_unknown_crop_is_config_error() {
        let err = DatasetConfig::from_toml_str(
            r#"
            hrrr_dir = "h"
            sentinel_dir = "s"
            usda_dir = "u"
            crop_type = "Rice"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AlignError::Config(_)));
    }

    #[test]
    fn test_duplicate_variables_are_rejected() {
        let err = DatasetConfig::from_toml_str(
            r#"
            hrrr_dir = "h"
            sentinel_dir = "s"
            usda_dir = "u"
            weather_variables = ["T", " T"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AlignError::Config(ref msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_with_base_dir_only_prefixes_relative_dirs() {
        let config = DatasetConfig {
            hrrr_dir: PathBuf::from("hrrr"),
            sentinel_dir: PathBuf::from("/abs/sentinel"),
            ..DatasetConfig::default()
        }
        .with_base_dir(Path::new("/mnt/cropnet"));
        assert_eq!(config.hrrr_dir, PathBuf::from("/mnt/cropnet/hrrr"));
        assert_eq!(config.sentinel_dir, PathBuf::from("/abs/sentinel"));
        assert_eq!(config.usda_dir, PathBuf::from("/mnt/cropnet/USDA Crop Dataset/data"));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cropnet.toml");
        fs::write(&path, "hrrr_dir = \"h\"\nsentinel_dir = \"s\"\nusda_dir = \"u\"\n").unwrap();
        let config = DatasetConfig::load(&path).unwrap();
        assert_eq!(config.hrrr_dir, PathBuf::from("h"));
    }
}
