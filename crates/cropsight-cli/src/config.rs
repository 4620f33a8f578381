//! Configuration file support for cropsight
//!
//! Supports both YAML and TOML configuration files.
//!
//! # Example YAML configuration:
//! ```yaml
//! # Crop recommendation service
//! soil:
//!   bind: "0.0.0.0"
//!   port: 8000
//!   scaler_path: /srv/models/scaler.json
//!   model_path: /srv/models/crop_model.json
//!   cors_origins:
//!     - "http://localhost:5173"
//!
//! # Disease detection service
//! symptom:
//!   port: 5000
//!   treatments_path: /srv/models/treatments.json
//!
//! # Height sensor monitor
//! monitor:
//!   device: /dev/ttyUSB0
//!
//! # Logging settings
//! logging:
//!   level: info
//!   format: json
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Soil-feature predictor (crop recommendation)
    pub soil: SoilServiceConfig,

    /// Symptom predictor (disease detection)
    pub symptom: SymptomServiceConfig,

    /// Height sensor monitor
    pub monitor: MonitorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Crop recommendation service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SoilServiceConfig {
    /// Bind address
    pub bind: String,

    /// Server port
    pub port: u16,

    /// Fitted scaler artifact
    pub scaler_path: PathBuf,

    /// Fitted classifier artifact
    pub model_path: PathBuf,

    /// Origins allowed to call the service from a browser
    pub cors_origins: Vec<String>,
}

impl Default for SoilServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
            scaler_path: PathBuf::from("models/scaler.json"),
            model_path: PathBuf::from("models/crop_model.json"),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Local development front-ends.
pub fn default_cors_origins() -> Vec<String> {
    [
        "http://localhost:5173",
        "http://localhost:3000",
        "http://127.0.0.1:5173",
        "http://127.0.0.1:3000",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Disease detection service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SymptomServiceConfig {
    /// Bind address
    pub bind: String,

    /// Server port
    pub port: u16,

    /// Fitted text vectorizer artifact
    pub vectorizer_path: PathBuf,

    /// Fitted classifier artifact
    pub model_path: PathBuf,

    /// Disease to treatment table
    pub treatments_path: PathBuf,
}

impl Default for SymptomServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5000,
            vectorizer_path: PathBuf::from("models/vectorizer.json"),
            model_path: PathBuf::from("models/disease_model.json"),
            treatments_path: PathBuf::from("models/treatments.json"),
        }
    }
}

/// Height sensor monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Serial device path, already configured for 9600 baud
    pub device: PathBuf,

    /// Number of readings kept for statistics
    pub history: usize,

    /// Consecutive read failures tolerated before giving up
    pub max_read_failures: u32,

    /// Delay between read retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/ttyUSB0"),
            history: 60,
            max_read_failures: 5,
            retry_delay_ms: 500,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML or TOML, auto-detected by extension)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let config = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            "toml" => Self::from_toml(&content),
            _ => {
                // Try YAML first, then TOML
                Self::from_yaml(&content).or_else(|_| Self::from_toml(&content))
            }
        }?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for origin in &self.soil.cors_origins {
            validate_origin(origin)?;
        }
        if self.monitor.history == 0 {
            return Err(ConfigError::InvalidValue(
                "monitor.history must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Merge another config into this one (other values take precedence if set)
    pub fn merge(&mut self, other: Config) {
        let soil_default = SoilServiceConfig::default();
        if other.soil.bind != soil_default.bind {
            self.soil.bind = other.soil.bind;
        }
        if other.soil.port != soil_default.port {
            self.soil.port = other.soil.port;
        }
        if other.soil.scaler_path != soil_default.scaler_path {
            self.soil.scaler_path = other.soil.scaler_path;
        }
        if other.soil.model_path != soil_default.model_path {
            self.soil.model_path = other.soil.model_path;
        }
        if other.soil.cors_origins != soil_default.cors_origins {
            self.soil.cors_origins = other.soil.cors_origins;
        }

        let symptom_default = SymptomServiceConfig::default();
        if other.symptom.bind != symptom_default.bind {
            self.symptom.bind = other.symptom.bind;
        }
        if other.symptom.port != symptom_default.port {
            self.symptom.port = other.symptom.port;
        }
        if other.symptom.vectorizer_path != symptom_default.vectorizer_path {
            self.symptom.vectorizer_path = other.symptom.vectorizer_path;
        }
        if other.symptom.model_path != symptom_default.model_path {
            self.symptom.model_path = other.symptom.model_path;
        }
        if other.symptom.treatments_path != symptom_default.treatments_path {
            self.symptom.treatments_path = other.symptom.treatments_path;
        }

        let monitor_default = MonitorConfig::default();
        if other.monitor.device != monitor_default.device {
            self.monitor.device = other.monitor.device;
        }
        if other.monitor.history != monitor_default.history {
            self.monitor.history = other.monitor.history;
        }
        if other.monitor.max_read_failures != monitor_default.max_read_failures {
            self.monitor.max_read_failures = other.monitor.max_read_failures;
        }
        if other.monitor.retry_delay_ms != monitor_default.retry_delay_ms {
            self.monitor.retry_delay_ms = other.monitor.retry_delay_ms;
        }

        let logging_default = LoggingConfig::default();
        if other.logging.level != logging_default.level {
            self.logging.level = other.logging.level;
        }
        if other.logging.format != logging_default.format {
            self.logging.format = other.logging.format;
        }
    }

    /// Create an example configuration
    pub fn example() -> Self {
        Self {
            soil: SoilServiceConfig {
                bind: "0.0.0.0".to_string(),
                port: 8000,
                scaler_path: PathBuf::from("/srv/cropsight/models/scaler.json"),
                model_path: PathBuf::from("/srv/cropsight/models/crop_model.json"),
                cors_origins: default_cors_origins(),
            },
            symptom: SymptomServiceConfig {
                bind: "0.0.0.0".to_string(),
                port: 5000,
                vectorizer_path: PathBuf::from("/srv/cropsight/models/vectorizer.json"),
                model_path: PathBuf::from("/srv/cropsight/models/disease_model.json"),
                treatments_path: PathBuf::from("/srv/cropsight/models/treatments.json"),
            },
            monitor: MonitorConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }

    /// Generate example YAML configuration
    pub fn example_yaml() -> String {
        serde_yaml::to_string(&Self::example()).unwrap_or_default()
    }

    /// Generate example TOML configuration
    pub fn example_toml() -> String {
        toml::to_string_pretty(&Self::example()).unwrap_or_default()
    }
}

/// A browser origin is `scheme://host[:port]` with nothing after it.
fn validate_origin(origin: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidValue(format!("invalid CORS origin '{}'", origin));

    let authority = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
        .ok_or_else(invalid)?;
    if authority.contains(['/', '?', '#', '@']) {
        return Err(invalid());
    }
    let host = match authority.rsplit_once(':') {
        Some((host, port)) => {
            port.parse::<u16>().map_err(|_| invalid())?;
            host
        }
        None => authority,
    };
    if host.is_empty() {
        return Err(invalid());
    }
    Ok(())
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    IoError(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid config: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.soil.port, 8000);
        assert_eq!(config.symptom.port, 5000);
        assert_eq!(config.soil.bind, "127.0.0.1");
        assert_eq!(config.soil.cors_origins.len(), 4);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
soil:
  port: 8080
  bind: "0.0.0.0"
symptom:
  treatments_path: /data/treatments.json
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.soil.port, 8080);
        assert_eq!(config.soil.bind, "0.0.0.0");
        assert_eq!(
            config.symptom.treatments_path,
            PathBuf::from("/data/treatments.json")
        );
        assert_eq!(config.symptom.port, 5000);
    }

    #[test]
    fn test_toml_parsing() {
        let toml = r#"
[soil]
port = 8080
cors_origins = ["https://farm.example.com"]

[monitor]
history = 120
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.soil.port, 8080);
        assert_eq!(config.soil.cors_origins, vec!["https://farm.example.com"]);
        assert_eq!(config.monitor.history, 120);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let override_config = Config {
            soil: SoilServiceConfig {
                port: 8888,
                ..Default::default()
            },
            ..Default::default()
        };

        base.merge(override_config);
        assert_eq!(base.soil.port, 8888);
        assert_eq!(base.symptom.port, 5000);
    }

    #[test]
    fn test_origin_validation() {
        assert!(validate_origin("http://localhost:5173").is_ok());
        assert!(validate_origin("https://farm.example.com").is_ok());
        assert!(validate_origin("localhost:5173").is_err());
        assert!(validate_origin("http://localhost:5173/app").is_err());
        assert!(validate_origin("http://localhost:5173/").is_err());
        assert!(validate_origin("ftp://files.example.com").is_err());
    }
}
