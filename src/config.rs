//! Configuration for SetuIO
//!
//! Loads the wire convention, network timings, GPS origin and the resolved
//! endpoint list from a TOML file. Name-to-id mapping is done by whoever
//! writes the file: every endpoint carries its pier and crane ids.

use crate::core::types::{CraneId, Endpoint};
use crate::error::{Error, Result};
use crate::geo::LocalTangentPlane;
use crate::protocol::WireConvention;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Longest read timeout that still keeps stop latency acceptable
pub const MAX_READ_TIMEOUT_MS: u64 = 2000;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub wire: WireConvention,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub gps: GpsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// Connection timings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Upper bound for one connect attempt
    pub connect_timeout_ms: u64,
    /// Upper bound for one blocking read; a stop request is seen within this
    pub read_timeout_ms: u64,
    /// Pause after every connect attempt, successful or not
    pub reconnect_delay_ms: u64,
    /// Extra pause after a read error before reconnecting
    pub error_cooldown_ms: u64,
    /// Bytes requested per read
    pub read_chunk_size: usize,
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_millis(self.error_cooldown_ms)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 1000,
            read_timeout_ms: 500,
            reconnect_delay_ms: 2000,
            error_cooldown_ms: 1000,
            read_chunk_size: 4096,
        }
    }
}

/// Tangent-plane origin for GPS fixes, decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GpsConfig {
    pub origin_latitude: f64,
    pub origin_longitude: f64,
}

impl GpsConfig {
    pub fn plane(&self) -> LocalTangentPlane {
        LocalTangentPlane::new(self.origin_latitude, self.origin_longitude)
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        let origin = LocalTangentPlane::default();
        Self {
            origin_latitude: origin.origin_latitude,
            origin_longitude: origin.origin_longitude,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins if set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// One crane controller as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Display name, e.g. `7_GC5`
    pub name: String,
    pub host: String,
    pub port: u16,
    pub pier_id: i32,
    pub crane_id: i32,
}

impl EndpointConfig {
    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint::new(
            &self.name,
            &self.host,
            self.port,
            CraneId::new(self.pier_id, self.crane_id),
        )
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// Parses only; call [`AppConfig::validate`] before using the result.
    ///
    /// # Example
    /// ```no_run
    /// use setu_io::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("setu-io.toml")?;
    /// config.validate()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check the configuration is usable as a whole
    pub fn validate(&self) -> Result<()> {
        self.wire.validate()?;

        if self.endpoints.is_empty() {
            return Err(Error::InvalidConfig("no endpoints configured".to_string()));
        }
        let mut names = HashSet::new();
        for ep in &self.endpoints {
            if ep.name.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "endpoint {}:{} has an empty name",
                    ep.host, ep.port
                )));
            }
            if !names.insert(ep.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate endpoint name '{}'",
                    ep.name
                )));
            }
        }

        if self.network.read_chunk_size == 0 {
            return Err(Error::InvalidConfig(
                "network.read_chunk_size must be positive".to_string(),
            ));
        }
        if self.network.read_timeout_ms == 0 || self.network.read_timeout_ms > MAX_READ_TIMEOUT_MS
        {
            return Err(Error::InvalidConfig(format!(
                "network.read_timeout_ms must be in 1..={}, got {}",
                MAX_READ_TIMEOUT_MS, self.network.read_timeout_ms
            )));
        }
        if self.network.connect_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "network.connect_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved endpoints in file order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.iter().map(EndpointConfig::to_endpoint).collect()
    }
}

impl Default for AppConfig {
    /// Gateway convention and one local endpoint, for development
    fn default() -> Self {
        Self {
            wire: WireConvention::gateway(),
            network: NetworkConfig::default(),
            gps: GpsConfig::default(),
            logging: LoggingConfig::default(),
            endpoints: vec![EndpointConfig {
                name: "gateway".to_string(),
                host: "127.0.0.1".to_string(),
                port: 5001,
                pier_id: 0,
                crane_id: 0,
            }],
        }
    }
}
