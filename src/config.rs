//! Configuration for the edge deployment coordinator
//!
//! Loads a TOML file with an `[mqtt]` section for the messaging core and an
//! optional `[deploy]` section for deployment defaults. The MQTT fields mirror
//! the broker connection surface: broker host, port, keepalive, client id, and
//! optional credentials.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeConfig {
    pub mqtt: ConnectionConfig,
    #[serde(default)]
    pub deploy: DeploySection,
}

/// Broker connection configuration. Immutable once a client is constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// Broker hostname or IP address
    #[serde(default = "default_broker")]
    pub broker: String,
    /// Broker port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Keepalive interval in seconds
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
    /// Client identifier presented to the broker (must match [a-zA-Z0-9._-]+)
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Optional broker username
    pub username: Option<String>,
    /// Optional broker password
    pub password: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            port: default_port(),
            keepalive_secs: default_keepalive(),
            client_id: default_client_id(),
            username: None,
            password: None,
        }
    }
}

fn default_broker() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_keepalive() -> u64 {
    60
}

fn default_client_id() -> String {
    "edge-deployment-manager".to_string()
}

/// Deployment defaults consumed by the manager facade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploySection {
    /// Default namespace for cluster deployments
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
        }
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid client ID format: {0}")]
    InvalidClientId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EdgeConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: EdgeConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_client_id(&self.mqtt.client_id)?;
        if self.mqtt.broker.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "mqtt.broker must not be empty".to_string(),
            ));
        }
        if self.mqtt.keepalive_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "mqtt.keepalive_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[mqtt]
broker = "localhost"
port = 1883
keepalive_secs = 60
client_id = "test-edge"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

/// Validate client ID charset so the broker session is addressable
fn validate_client_id(client_id: &str) -> Result<(), ConfigError> {
    let valid_chars = client_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if client_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidClientId(format!(
            "Client ID '{client_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
