use sentinel_monitor::MonitorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{OperatorError, Result};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OperatorConfig {
    pub server: ServerConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Begin sampling as soon as the server is up.
    pub autostart: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["http://localhost:3000".to_string()],
            autostart: false,
        }
    }
}

impl OperatorConfig {
    /// Loads `path` (if present) layered with `SENTINEL__*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SENTINEL").separator("__"))
            .build()
            .map_err(|e| OperatorError::Config(e.to_string()))?;

        let config: OperatorConfig = settings
            .try_deserialize()
            .map_err(|e| OperatorError::Config(e.to_string()))?;

        config.monitor.validate()?;
        if config.server.port == 0 {
            return Err(OperatorError::Config("server.port must be non-zero".to_string()));
        }
        Ok(config)
    }
}
