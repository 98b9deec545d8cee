use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime settings for the dashboard server and shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Default `env_logger` filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Origins allowed to call the API; `*` allows any
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl Config {
    /// Defaults, then the TOML file if one is given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `DASHBOARD_*` overrides looked up through `var`
    pub fn with_env<F>(mut self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("DASHBOARD_HOST") {
            self.host = host;
        }
        if let Some(port) = var("DASHBOARD_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| DashboardError::Config(format!("invalid DASHBOARD_PORT: {}", port)))?;
        }
        if let Some(level) = var("DASHBOARD_LOG") {
            self.log_level = level;
        }
        if let Some(origins) = var("DASHBOARD_CORS") {
            self.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        Ok(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Starts `env_logger`, letting `RUST_LOG` win over the configured level
pub fn init_logging(config: &Config) {
    let env = env_logger::Env::default().default_filter_or(config.log_level.as_str());
    let _ = env_logger::Builder::from_env(env).try_init();
}
