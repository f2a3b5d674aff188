//! Configuration loading for the charge park and car processes.
//!
//! The configuration is stored in TOML format. Every field has a default, so
//! an empty file (or no file at all) yields a working setup:
//! - Bus topics for the charger, the monitor and the car
//! - Charging simulation parameters
//! - Dashboard endpoint and delivery policy
//! - Bind address of the charger-configuration endpoint
//! - Log level and format

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on `dashboard.max_attempts`.
pub const MAX_DASHBOARD_ATTEMPTS: u32 = 10;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Bus topics, one inbound topic per process role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BusConfig {
    pub charger_topic: String,
    pub monitor_topic: String,
    pub car_topic: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            charger_topic: "ttm4115/team_04/charger".to_string(),
            monitor_topic: "ttm4115/team_04/charger_monitor".to_string(),
            car_topic: "ttm4115/team_04/car".to_string(),
        }
    }
}

/// Charging simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChargerConfig {
    /// Period of the status tick while charging.
    pub tick_interval_ms: u64,

    /// Percentage points added per tick.
    pub step: i64,

    /// Progress ratio above which the light turns pulsating yellow.
    pub soon_available_threshold: f64,

    /// Percentage assumed until a configuration arrives.
    pub initial_percentage: i64,

    /// Goal assumed until a configuration arrives.
    pub goal: i64,
}

impl ChargerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            step: 5,
            soon_available_threshold: 0.7,
            initial_percentage: 20,
            goal: 20,
        }
    }
}

/// Dashboard status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Reports are discarded (and logged) when disabled.
    pub enabled: bool,

    pub url: String,

    pub timeout_ms: u64,

    /// Attempts per report, including the first. `1` means never retried;
    /// at most [`MAX_DASHBOARD_ATTEMPTS`].
    pub max_attempts: u32,

    /// Reports waiting for delivery; newer reports are dropped when full.
    pub queue_capacity: usize,
}

impl DashboardConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://localhost:8080/api/charger".to_string(),
            timeout_ms: 5000,
            max_attempts: 1,
            queue_capacity: 64,
        }
    }
}

/// Charger-configuration HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigApiConfig {
    pub bind: String,
}

impl Default for ConfigApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParkConfig {
    pub bus: BusConfig,
    pub charger: ChargerConfig,
    pub dashboard: DashboardConfig,
    pub config_api: ConfigApiConfig,
    pub logging: LoggingConfig,
}

impl ParkConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ParkConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut topics = HashSet::new();
        for topic in [
            &self.bus.charger_topic,
            &self.bus.monitor_topic,
            &self.bus.car_topic,
        ] {
            if topic.is_empty() || topic.contains(['+', '#']) {
                return Err(invalid(format!("topic '{topic}' must be a concrete topic")));
            }
            if !topics.insert(topic) {
                return Err(invalid(format!("topic '{topic}' is used more than once")));
            }
        }

        let charger = &self.charger;
        if charger.tick_interval_ms == 0 {
            return Err(invalid("charger.tick_interval_ms must be positive"));
        }
        if charger.step <= 0 {
            return Err(invalid("charger.step must be positive"));
        }
        let threshold = charger.soon_available_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(invalid(format!(
                "charger.soon_available_threshold must be in (0, 1], got {threshold}"
            )));
        }

        let dashboard = &self.dashboard;
        if dashboard.max_attempts == 0 || dashboard.max_attempts > MAX_DASHBOARD_ATTEMPTS {
            return Err(invalid(format!(
                "dashboard.max_attempts must be in 1..={MAX_DASHBOARD_ATTEMPTS}, got {}",
                dashboard.max_attempts
            )));
        }
        if dashboard.queue_capacity == 0 {
            return Err(invalid("dashboard.queue_capacity must be at least 1"));
        }
        if dashboard.enabled && dashboard.url.is_empty() {
            return Err(invalid("dashboard.url is required when the dashboard is enabled"));
        }

        self.config_api_addr()?;
        Ok(())
    }

    pub fn config_api_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.config_api.bind.parse().map_err(|_| {
            invalid(format!(
                "config_api.bind '{}' is not a socket address",
                self.config_api.bind
            ))
        })
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
