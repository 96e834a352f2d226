// src/config.rs
//! Configuration management with file-backed storage

use crate::error::{GpsError, Result};
use crate::registry::DEFAULT_PERIOD_MS;
use crate::relay::StreamSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Conventional TCP port for NMEA-0183 streams.
pub const DEFAULT_TCP_PORT: u16 = 10110;

/// Persistent relay settings, stored as JSON under
/// `~/.config/gps-relay/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Source kind, `"tcp"` or `"serial"`.
    pub source_type: String,
    pub tcp_host: Option<String>,
    pub tcp_port: Option<u16>,
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
    pub default_period_ms: Option<i64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            source_type: "tcp".to_string(),
            tcp_host: Some("localhost".to_string()),
            tcp_port: Some(DEFAULT_TCP_PORT),
            serial_port: None,
            serial_baudrate: Some(9600),
            default_period_ms: Some(DEFAULT_PERIOD_MS),
        }
    }
}

impl RelayConfig {
    /// Load the configuration from the config file, falling back to the
    /// defaults when no file exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| GpsError::Other(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GpsError::Other(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save the configuration to the config file.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GpsError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| GpsError::Other(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)
            .map_err(|e| GpsError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| GpsError::Other("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("gps-relay")
            .join("config.json"))
    }

    /// Point the configuration at a TCP source.
    pub fn update_tcp(&mut self, host: String, port: u16) {
        self.source_type = "tcp".to_string();
        self.tcp_host = Some(host);
        self.tcp_port = Some(port);
    }

    /// Point the configuration at a serial source.
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = Some(baudrate);
    }

    /// The stream source this configuration names.
    pub fn source(&self) -> Result<StreamSource> {
        match self.source_type.as_str() {
            "tcp" => Ok(StreamSource::Tcp {
                host: self
                    .tcp_host
                    .clone()
                    .unwrap_or_else(|| "localhost".to_string()),
                port: self.tcp_port.unwrap_or(DEFAULT_TCP_PORT),
            }),
            "serial" => {
                let port = self.serial_port.clone().ok_or_else(|| {
                    GpsError::Other("serial source configured without a port".to_string())
                })?;
                Ok(StreamSource::Serial {
                    port,
                    baudrate: self.serial_baudrate.unwrap_or(9600),
                })
            }
            other => Err(GpsError::Other(format!("unknown source type: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.source_type, "tcp");
        assert_eq!(config.tcp_host, Some("localhost".to_string()));
        assert_eq!(config.tcp_port, Some(DEFAULT_TCP_PORT));
        assert_eq!(config.default_period_ms, Some(DEFAULT_PERIOD_MS));
    }

    #[test]
    fn test_update_serial() {
        let mut config = RelayConfig::default();
        config.update_serial("/dev/ttyUSB0".to_string(), 115200);
        assert_eq!(config.source_type, "serial");
        assert_eq!(config.serial_port, Some("/dev/ttyUSB0".to_string()));
        assert_eq!(config.serial_baudrate, Some(115200));
    }

    #[test]
    fn test_source_resolution() {
        let mut config = RelayConfig::default();
        match config.source().unwrap() {
            StreamSource::Tcp { host, port } => {
                assert_eq!(host, "localhost");
                assert_eq!(port, DEFAULT_TCP_PORT);
            }
            other => panic!("unexpected source: {:?}", other),
        }

        // a serial source needs a port name
        config.source_type = "serial".to_string();
        assert!(config.source().is_err());

        config.update_serial("/dev/ttyACM0".to_string(), 4800);
        assert!(matches!(config.source(), Ok(StreamSource::Serial { .. })));

        config.source_type = "carrier-pigeon".to_string();
        assert!(config.source().is_err());
    }

    #[test]
    fn test_round_trips_through_json() {
        let mut config = RelayConfig::default();
        config.update_tcp("gps.example.net".to_string(), 5001);
        let text = serde_json::to_string(&config).unwrap();
        let back: RelayConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.source_type, "tcp");
        assert_eq!(back.tcp_host, Some("gps.example.net".to_string()));
        assert_eq!(back.tcp_port, Some(5001));
    }
}
