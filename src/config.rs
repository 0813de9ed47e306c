// src/config.rs

//! Manages server configuration: loading, defaults, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// What the broadcast fan-out does when a session's outbound queue is full.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Drop the message for the slow session only.
    #[default]
    Drop,
    /// Tear the slow session down as if it had disconnected.
    Disconnect,
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    8889
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

/// Represents the raw configuration as read from the TOML file.
#[derive(Deserialize, Debug)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_clients")]
    max_clients: usize,
    #[serde(default = "default_command_prefix")]
    command_prefix: String,
    #[serde(with = "humantime_serde", default = "default_idle_timeout")]
    idle_timeout: Duration,
    #[serde(with = "humantime_serde", default = "default_timeout_grace")]
    timeout_grace: Duration,
    #[serde(default = "default_read_buffer_size")]
    read_buffer_size: usize,
    #[serde(default = "default_max_line_length")]
    max_line_length: usize,
    #[serde(default = "default_outbound_queue_capacity")]
    outbound_queue_capacity: usize,
    #[serde(default = "default_bus_capacity")]
    bus_capacity: usize,
    #[serde(default)]
    overflow_policy: OverflowPolicy,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8888
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    1024
}
fn default_command_prefix() -> String {
    "shell".to_string()
}
fn default_idle_timeout() -> Duration {
    Duration::from_secs(60)
}
fn default_timeout_grace() -> Duration {
    Duration::from_secs(2)
}
fn default_read_buffer_size() -> usize {
    4096
}
fn default_max_line_length() -> usize {
    4096
}
fn default_outbound_queue_capacity() -> usize {
    256
}
fn default_bus_capacity() -> usize {
    1024
}

/// Represents the final, validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_clients: usize,
    /// The leading token that marks an inbound line as a command.
    pub command_prefix: String,
    /// How long a session may stay silent before it is disconnected.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    /// How long a timed-out session is kept open so its final notice can be written.
    #[serde(with = "humantime_serde")]
    pub timeout_grace: Duration,
    /// The number of bytes requested from the socket per read.
    pub read_buffer_size: usize,
    /// The longest inbound line accepted, excluding its terminator.
    pub max_line_length: usize,
    pub outbound_queue_capacity: usize,
    pub bus_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            command_prefix: default_command_prefix(),
            idle_timeout: default_idle_timeout(),
            timeout_grace: default_timeout_grace(),
            read_buffer_size: default_read_buffer_size(),
            max_line_length: default_max_line_length(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            bus_capacity: default_bus_capacity(),
            overflow_policy: OverflowPolicy::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{}'", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid configuration in '{}'", path.display()))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;

        let config = Config {
            host: raw_config.host,
            port: raw_config.port,
            log_level: raw_config.log_level,
            max_clients: raw_config.max_clients,
            command_prefix: raw_config.command_prefix,
            idle_timeout: raw_config.idle_timeout,
            timeout_grace: raw_config.timeout_grace,
            read_buffer_size: raw_config.read_buffer_size,
            max_line_length: raw_config.max_line_length,
            outbound_queue_capacity: raw_config.outbound_queue_capacity,
            bus_capacity: raw_config.bus_capacity,
            overflow_policy: raw_config.overflow_policy,
            metrics: raw_config.metrics,
        };

        config.validate()?;
        Ok(config)
    }

    /// The `host:port` string the listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates the configuration to ensure logical consistency.
    ///
    /// Port `0` is rejected here because it only makes sense for embedded
    /// servers, which build their `Config` in code.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        self.validate_runtime()?;

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the main server port"
                ));
            }
        }
        Ok(())
    }

    /// The checks that apply to every server instance, including ones bound to an
    /// ephemeral port.
    pub(crate) fn validate_runtime(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.command_prefix.is_empty() {
            return Err(anyhow!("command_prefix cannot be empty"));
        }
        if self.command_prefix.chars().any(char::is_whitespace) {
            return Err(anyhow!("command_prefix cannot contain whitespace"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        if self.read_buffer_size == 0 {
            return Err(anyhow!("read_buffer_size cannot be 0"));
        }
        if self.max_line_length == 0 {
            return Err(anyhow!("max_line_length cannot be 0"));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(anyhow!("outbound_queue_capacity cannot be 0"));
        }
        if self.bus_capacity == 0 {
            return Err(anyhow!("bus_capacity cannot be 0"));
        }
        if self.idle_timeout.is_zero() {
            return Err(anyhow!("idle_timeout cannot be 0"));
        }
        if self.timeout_grace >= self.idle_timeout {
            return Err(anyhow!("timeout_grace must be shorter than idle_timeout"));
        }
        if self.outbound_queue_capacity < 4 {
            warn!(
                "outbound_queue_capacity is {}. Slow clients will lose messages almost immediately.",
                self.outbound_queue_capacity
            );
        }
        Ok(())
    }
}
