// Configuration utilities
// Author: Gabriel Demetrios Lafis

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::{BackendKind, DatasourceSettings};
use crate::encode::{BackendVersion, EncodeError};
use crate::spec::Edition;
use super::{parse_level, AppError, AppResult};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub datasource: DatasourceConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    #[serde(default)]
    pub enable_cors: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Monitoring site the data source talks to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasourceConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    /// Edition tag, e.g. `cee`, `raw`, `pro` or `community`
    #[serde(default = "default_edition")]
    pub edition: String,
    #[serde(default)]
    pub backend: BackendKind,
    pub backend_version: Option<String>,
}

fn default_edition() -> String {
    "cee".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            enable_cors: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        DatasourceConfig {
            url: None,
            username: None,
            edition: default_edition(),
            backend: BackendKind::default(),
            backend_version: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
        match extension {
            "json" => serde_json::from_str(&contents).map_err(|e| AppError::Config(e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| AppError::Config(e.to_string())),
            _ => Err(AppError::Config(format!(
                "Unsupported config file format: {}",
                path.display()
            ))),
        }
    }

    /// Get the log level filter
    pub fn log_level_filter(&self) -> log::LevelFilter {
        parse_level(&self.logging.level)
    }

    /// Edition family of the configured edition tag
    pub fn edition(&self) -> Edition {
        Edition::from_tag(&self.datasource.edition)
    }

    /// Parsed backend version hint, if one is configured
    pub fn backend_version(&self) -> Result<Option<BackendVersion>, EncodeError> {
        self.datasource
            .backend_version
            .as_deref()
            .map(str::parse)
            .transpose()
    }

    /// Connection settings for the backend drivers
    pub fn datasource_settings(&self) -> AppResult<DatasourceSettings> {
        let url = self
            .datasource
            .url
            .as_deref()
            .ok_or_else(|| AppError::Config("datasource.url is not set".to_string()))?;

        let mut settings = DatasourceSettings::new(url, self.edition());
        if let Some(username) = &self.datasource.username {
            settings = settings.with_username(username.clone());
        }
        if let Some(version) = self.backend_version()? {
            settings = settings.with_version(version);
        }
        Ok(settings)
    }
}
