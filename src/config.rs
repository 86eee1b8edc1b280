//! Configuration for coolmaster
//!
//! Centralized configuration with sensible defaults.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::{AcError, Result};
use crate::translate::TemperatureUnit;

/// Port the controller's command shell listens on
pub const DEFAULT_PORT: u16 = 10102;

/// Main configuration for one controller endpoint
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Controller host name or IP address
    pub host: String,

    /// Controller command shell port
    pub port: u16,

    /// TCP connect + handshake timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Timeout for one command/response exchange (milliseconds)
    pub command_timeout_ms: u64,

    /// Quiet period that ends the post-handshake drain (milliseconds)
    pub settle_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Shell prompt that terminates every response
    pub prompt: String,

    /// Unit reported when the controller's state line carries no unit suffix
    pub default_temperature_unit: TemperatureUnit,

    // -------------------------------------------------------------------------
    // Unit Configuration
    // -------------------------------------------------------------------------
    /// AC units attached to this controller
    pub units: Vec<UnitConfig>,
}

/// One AC unit managed by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitConfig {
    /// Controller unit id, e.g. `L1.100`
    pub unique_id: String,

    /// Human readable name used in logs
    pub display_name: String,
}

impl UnitConfig {
    pub fn new(unique_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            display_name: display_name.into(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 3000,
            command_timeout_ms: 1500,
            settle_ms: 50,
            prompt: ">".to_string(),
            default_temperature_unit: TemperatureUnit::Celsius,
            units: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` string used for connecting and logging
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Check the config for values the transport cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(AcError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(AcError::Config("port must not be 0".to_string()));
        }
        if self.connect_timeout_ms == 0 || self.command_timeout_ms == 0 {
            return Err(AcError::Config("timeouts must be greater than 0".to_string()));
        }
        if self.settle_ms >= self.connect_timeout_ms {
            return Err(AcError::Config(
                "settle period must be shorter than the connect timeout".to_string(),
            ));
        }
        if self.prompt.is_empty() {
            return Err(AcError::Config("prompt must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for unit in &self.units {
            if unit.unique_id.trim().is_empty() {
                return Err(AcError::Config("unit id must not be empty".to_string()));
            }
            if !seen.insert(unit.unique_id.as_str()) {
                return Err(AcError::Config(format!(
                    "duplicate unit id: {}",
                    unit.unique_id
                )));
            }
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the controller host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the controller port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the per-command timeout (in milliseconds)
    pub fn command_timeout_ms(mut self, ms: u64) -> Self {
        self.config.command_timeout_ms = ms;
        self
    }

    /// Set the post-handshake settle period (in milliseconds)
    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.config.settle_ms = ms;
        self
    }

    /// Set the shell prompt
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    /// Set the fallback temperature unit
    pub fn default_temperature_unit(mut self, unit: TemperatureUnit) -> Self {
        self.config.default_temperature_unit = unit;
        self
    }

    /// Add one AC unit
    pub fn unit(mut self, unique_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.config.units.push(UnitConfig::new(unique_id, display_name));
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
