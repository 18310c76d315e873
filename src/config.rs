//! Configuration for the OPC-DA bridge.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TagValue;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Zenoh connection settings.
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Tag polling settings.
    pub opcda: OpcdaConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Load configuration from a JSON5 file and validate it.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string and validate it.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.opcda.tags.is_empty() {
            return Err(ConfigError::Validation(
                "at least one tag is required".to_string(),
            ));
        }
        if self.opcda.workers == 0 {
            return Err(ConfigError::Validation(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.opcda.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Zenoh connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZenohConfig {
    /// Session mode: "client", "peer", or "router".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Endpoints to connect to (client mode).
    #[serde(default)]
    pub connect: Vec<String>,

    /// Endpoints to listen on (peer/router mode).
    #[serde(default)]
    pub listen: Vec<String>,
}

fn default_mode() -> String {
    "peer".to_string()
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connect: Vec::new(),
            listen: Vec::new(),
        }
    }
}

/// Tag polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpcdaConfig {
    /// OPC-DA server ProgID, recorded for log context.
    pub server_id: String,

    /// Tag-source host name.
    #[serde(default = "default_host")]
    pub host: String,

    /// Tag paths to poll each cycle.
    pub tags: Vec<String>,

    /// Poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Topic (key expression) readings publish under.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Worker pool size; each worker holds its own connection.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Which broker adapter to publish through.
    #[serde(default)]
    pub broker: BrokerKind,

    /// Readings served by the built-in simulated source.
    ///
    /// The real OPC-DA binding is supplied externally through the
    /// [`TagSource`](crate::source::TagSource) trait; the shipped binary
    /// polls this table instead. Tags without an entry read as `0.0`.
    #[serde(default)]
    pub simulation: HashMap<String, TagValue>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_topic() -> String {
    "opcda/tags".to_string()
}

fn default_workers() -> usize {
    2
}

/// Broker adapter selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    /// Publish to a Zenoh session (default).
    #[default]
    Zenoh,
    /// Write readings to stdout.
    Console,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let json5 = r#"
        {
            zenoh: {
                mode: "client",
                connect: ["tcp/localhost:7447"],
            },
            opcda: {
                server_id: "Matrikon.OPC.Simulation.1",
                host: "opcsrv01",
                tags: ["Plant.Line1.Temp", "Plant.Line1.Pressure"],
                poll_interval_ms: 500,
                topic: "plant/line1",
                workers: 4,
                broker: "console",
            },
            logging: {
                level: "debug",
                format: "json",
            },
        }
        "#;

        let config = BridgeConfig::parse(json5).expect("parse failed");
        assert_eq!(config.zenoh.mode, "client");
        assert_eq!(config.zenoh.connect, vec!["tcp/localhost:7447"]);
        assert_eq!(config.opcda.server_id, "Matrikon.OPC.Simulation.1");
        assert_eq!(config.opcda.tags.len(), 2);
        assert_eq!(config.opcda.poll_interval_ms, 500);
        assert_eq!(config.opcda.topic, "plant/line1");
        assert_eq!(config.opcda.workers, 4);
        assert_eq!(config.opcda.broker, BrokerKind::Console);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn defaults_fill_in_omitted_fields() {
        let json5 = r#"
        {
            opcda: {
                server_id: "OPC.Server.1",
                tags: ["Tag1"],
            },
        }
        "#;

        let config = BridgeConfig::parse(json5).expect("parse failed");
        assert_eq!(config.zenoh.mode, "peer");
        assert_eq!(config.opcda.host, "localhost");
        assert_eq!(config.opcda.poll_interval_ms, 1000);
        assert_eq!(config.opcda.topic, "opcda/tags");
        assert_eq!(config.opcda.workers, 2);
        assert_eq!(config.opcda.broker, BrokerKind::Zenoh);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn simulation_values_parse_into_tag_values() {
        let json5 = r#"
        {
            opcda: {
                server_id: "OPC.Server.1",
                tags: ["Tag1", "Tag2"],
                simulation: { Tag1: 42, Tag2: "running" },
            },
        }
        "#;

        let config = BridgeConfig::parse(json5).expect("parse failed");
        assert_eq!(
            config.opcda.simulation.get("Tag1"),
            Some(&TagValue::Float(42.0))
        );
        assert_eq!(
            config.opcda.simulation.get("Tag2"),
            Some(&TagValue::Text("running".to_string()))
        );
    }

    #[test]
    fn empty_tag_list_fails_validation() {
        let json5 = r#"{ opcda: { server_id: "S", tags: [] } }"#;
        assert!(matches!(
            BridgeConfig::parse(json5),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn zero_workers_fails_validation() {
        let json5 = r#"{ opcda: { server_id: "S", tags: ["T"], workers: 0 } }"#;
        assert!(matches!(
            BridgeConfig::parse(json5),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn zero_interval_fails_validation() {
        let json5 = r#"{ opcda: { server_id: "S", tags: ["T"], poll_interval_ms: 0 } }"#;
        assert!(matches!(
            BridgeConfig::parse(json5),
            Err(ConfigError::Validation(_))
        ));
    }
}
