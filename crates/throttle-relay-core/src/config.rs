//! Configuration structures for throttle-relay.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::proxy::throttle::Throttle;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Relay configuration.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Which of the two transfer paths get throttled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Throttle the client to upstream path.
    #[serde(rename = "cs")]
    ClientToServer,
    /// Throttle the upstream to client path.
    #[serde(rename = "sc")]
    ServerToClient,
    /// Throttle both paths.
    #[default]
    #[serde(rename = "both")]
    Both,
    /// Plain relay in both directions.
    #[serde(rename = "none")]
    None,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToServer => "cs",
            Direction::ServerToClient => "sc",
            Direction::Both => "both",
            Direction::None => "none",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cs" => Ok(Direction::ClientToServer),
            "sc" => Ok(Direction::ServerToClient),
            "both" => Ok(Direction::Both),
            "none" => Ok(Direction::None),
            other => Err(Error::Config(format!(
                "direction '{}' (expected cs, sc, both or none)",
                other
            ))),
        }
    }
}

/// Relay endpoints and throttling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Local address to accept clients on.
    #[serde(default)]
    pub listen: String,

    /// Remote address every session is relayed to.
    #[serde(default)]
    pub upstream: String,

    /// Bytes per throttled write.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pause after each throttled write, in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,

    /// Throttled path(s).
    #[serde(default)]
    pub direction: Direction,

    /// Seconds to wait for running sessions on shutdown.
    #[serde(default)]
    pub drain_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: String::new(),
            upstream: String::new(),
            chunk_size: default_chunk_size(),
            delay_ms: 0,
            direction: Direction::default(),
            drain_timeout_secs: 0,
        }
    }
}

fn default_chunk_size() -> usize {
    1
}

/// Host used for a listen address given as `:port`.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// Host used for an upstream address given as `:port`.
pub const DEFAULT_UPSTREAM_HOST: &str = "127.0.0.1";

/// Fill in `host` when `addr` has an empty host part (`:8080`).
fn with_default_host(addr: &str, host: &str) -> String {
    let addr = addr.trim();
    if addr.starts_with(':') {
        format!("{}{}", host, addr)
    } else {
        addr.to_string()
    }
}

impl RelayConfig {
    /// Check the invariants every session relies on.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < 1 {
            return Err(Error::Config("size must be at least 1".into()));
        }
        if self.listen.trim().is_empty() {
            return Err(Error::Config("listen address is empty".into()));
        }
        if self.upstream.trim().is_empty() {
            return Err(Error::Config("upstream address is empty".into()));
        }
        Ok(())
    }

    /// Address to bind; `:port` listens on all interfaces.
    pub fn listen_addr(&self) -> String {
        with_default_host(&self.listen, DEFAULT_LISTEN_HOST)
    }

    /// Address to dial; `:port` dials the local host.
    pub fn upstream_addr(&self) -> String {
        with_default_host(&self.upstream, DEFAULT_UPSTREAM_HOST)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Pacing applied to throttled paths.
    pub fn throttle(&self) -> Throttle {
        Throttle::new(self.chunk_size, self.delay())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional).
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
