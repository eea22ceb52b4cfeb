//! Runtime configuration for the fleet daemon.
//!
//! Configuration layers, lowest precedence first: built-in defaults, an
//! optional YAML file, then `FLEETWRIGHT_`-prefixed environment variables
//! with `__` separating nested keys (for example
//! `FLEETWRIGHT_HEALTH__INTERVAL_SECS=30`).

use crate::infrastructure::domain::ManagementPlugin;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "FLEETWRIGHT_";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read or did not match the schema.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    /// A value is out of range.
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Persistence backend.
    pub database: DatabaseConfig,
    /// Periodic health probing.
    pub health: HealthConfig,
    /// Discovery sweeps.
    pub discovery: DiscoveryConfig,
    /// Docker Engine API client.
    pub docker: DockerConfig,
    /// SSH transport.
    pub ssh: SshConfig,
    /// Tag cache.
    pub tags: TagConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Statically configured marketplace.
    pub marketplace: MarketplaceConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the REST facade binds to.
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// Persistence settings. Without a URL the daemon keeps state in memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: Option<String>,
    /// Maximum pooled connections.
    pub pool_size: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 8,
        }
    }
}

/// Health monitor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Whether the daemon probes instances periodically.
    pub enabled: bool,
    /// Seconds between probe rounds.
    pub interval_secs: u64,
    /// Deadline for one probe, in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            probe_timeout_secs: 15,
        }
    }
}

impl HealthConfig {
    /// Returns the probe interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Returns the per-probe deadline.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Deadline for one sweep, in seconds.
    pub sweep_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            sweep_timeout_secs: 120,
        }
    }
}

impl DiscoveryConfig {
    /// Returns the sweep deadline.
    #[must_use]
    pub const fn sweep_timeout(&self) -> Duration {
        Duration::from_secs(self.sweep_timeout_secs)
    }
}

/// Docker Engine API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
        }
    }
}

impl DockerConfig {
    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// SSH transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Connection and authentication timeout, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
        }
    }
}

impl SshConfig {
    /// Returns the connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Tag cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    /// Seconds a derived tag set stays cached.
    pub cache_ttl_secs: u64,
    /// Maximum cached instances.
    pub cache_capacity: u64,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 30,
            cache_capacity: 10_000,
        }
    }
}

impl TagConfig {
    /// Returns the cache time to live.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,fleetwright=debug".to_owned(),
            json: false,
        }
    }
}

/// Marketplace settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Base URL plugin component entry points are derived from.
    pub component_base_url: String,
    /// Plugins known to the daemon.
    pub plugins: Vec<ManagementPlugin>,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            component_base_url: "/plugins".to_owned(),
            plugins: Vec::new(),
        }
    }
}

impl FleetConfig {
    /// Loads configuration from defaults, an optional YAML file and the
    /// environment, then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a layer cannot be read or parsed
    /// and [`ConfigError::Invalid`] when validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(file) = path {
            figment = figment.merge(Yaml::file(file));
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extracts and validates configuration from a prepared figment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on extraction or validation failure.
    pub fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.database.pool_size == 0, "database.pool_size"),
            (self.health.interval_secs == 0, "health.interval_secs"),
            (self.health.probe_timeout_secs == 0, "health.probe_timeout_secs"),
            (self.discovery.sweep_timeout_secs == 0, "discovery.sweep_timeout_secs"),
            (self.docker.request_timeout_secs == 0, "docker.request_timeout_secs"),
            (self.ssh.connect_timeout_secs == 0, "ssh.connect_timeout_secs"),
            (self.tags.cache_capacity == 0, "tags.cache_capacity"),
        ];
        checks
            .into_iter()
            .find(|(invalid, _)| *invalid)
            .map_or(Ok(()), |(_, field)| {
                Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero",
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_are_valid() {
        let config = FleetConfig::default();

        assert!(config.validate().is_ok());
        assert!(config.database.url.is_none());
    }

    #[rstest]
    fn yaml_layer_overrides_defaults() {
        let yaml = r"
health:
  interval_secs: 45
marketplace:
  plugins:
    - id: pg
      slug: postgres-manager
      name: Postgres Manager
      capabilities:
        serviceType: postgresql
";
        let figment = Figment::new()
            .merge(Serialized::defaults(FleetConfig::default()))
            .merge(Yaml::string(yaml));

        let config = FleetConfig::extract(figment).expect("configuration should load");

        assert_eq!(config.health.interval_secs, 45);
        assert_eq!(config.health.probe_timeout_secs, 15);
        assert_eq!(config.marketplace.plugins.len(), 1);
    }

    #[rstest]
    fn zero_intervals_are_rejected() {
        let mut config = FleetConfig::default();
        config.health.interval_secs = 0;

        let result = config.validate();

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "health.interval_secs",
                ..
            })
        ));
    }

    #[rstest]
    fn database_url_is_redacted_in_debug_output() {
        let config = DatabaseConfig {
            url: Some("postgres://fleet:hunter2@db/fleet".to_owned()),
            pool_size: 4,
        };

        let rendered = format!("{config:?}");

        assert!(!rendered.contains("hunter2"));
    }
}
