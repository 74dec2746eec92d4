// Application configuration.
//
// Settings come from an optional TOML file, then environment overrides.
//
// Environment variables:
// - `AREA_REPORT_CONFIG`: path of the TOML file (default: `area_report.toml`)
// - `AREA_REPORT_API_URL`: base URL of the area import API
// - `AREA_REPORT_SVG`: path of the SVG map with TERYT-coded paths
// - `AREA_REPORT_OUT_DIR`: directory for generated files

use crate::fields::FieldNaming;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "area_report.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub svg_map_path: PathBuf,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub tag_check_fields: FieldNaming,
    /// Age in days at which the recency gradient reaches its worst color.
    pub recency_max_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_base_url: "http://localhost:8000".to_string(),
            svg_map_path: PathBuf::from("counties.svg"),
            output_dir: PathBuf::from("."),
            request_timeout_secs: 20,
            tag_check_fields: FieldNaming::DataCheck,
            recency_max_days: 30,
        }
    }
}

impl AppConfig {
    /// Load from the file named by `AREA_REPORT_CONFIG` (or the default
    /// file name), then apply environment overrides. A missing file is not
    /// an error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("AREA_REPORT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            AppConfig::default()
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("AREA_REPORT_API_URL") {
            self.api_base_url = url;
        }
        if let Some(svg) = lookup("AREA_REPORT_SVG") {
            self.svg_map_path = PathBuf::from(svg);
        }
        if let Some(dir) = lookup("AREA_REPORT_OUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_base_url must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.recency_max_days <= 0 {
            return Err(ConfigError::Invalid(
                "recency_max_days must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
