//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration for the Turnstile service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            rate_limiting: RateLimitingConfig::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8889".parse().unwrap()
}

/// Rate limiting configuration, applied uniformly to every client key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Maximum burst size per client (token bucket capacity)
    #[serde(default = "default_burst_capacity")]
    pub burst_capacity: u32,

    /// Sustained requests per second per client (token refill rate)
    #[serde(default = "default_refill_rate")]
    pub refill_rate_per_sec: f64,

    /// How clients are identified
    #[serde(default)]
    pub key_strategy: KeyStrategy,

    /// Seconds a client bucket may sit idle before eviction
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,

    /// Interval in seconds between idle-bucket sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            burst_capacity: default_burst_capacity(),
            refill_rate_per_sec: default_refill_rate(),
            key_strategy: KeyStrategy::default(),
            idle_ttl_secs: default_idle_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_burst_capacity() -> u32 {
    200
}

fn default_refill_rate() -> f64 {
    490.0
}

fn default_idle_ttl() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

/// How the client key is derived from the peer address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// Key on the peer IP only: every connection from one host shares a
    /// bucket.
    #[default]
    Ip,
    /// Key on the full peer address including the ephemeral source port.
    /// Nearly every TCP connection then gets its own bucket, which defeats
    /// per-client limiting; kept for compatibility, not recommended.
    Socket,
}

impl TurnstileConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TurnstileConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::TurnstileError::Config(e.to_string()))?;
        Ok(config)
    }
}
