//! Error types for the throttle-relay proxy.

use thiserror::Error;

/// Result type alias for throttle-relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during relay operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read from the source stream of a copier.
    #[error("Failed to read: {0}")]
    Read(#[source] std::io::Error),

    /// Failed to write to the destination stream of a copier.
    #[error("Failed to write: {0}")]
    Write(#[source] std::io::Error),

    /// Listening socket could not be bound.
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Upstream could not be reached.
    #[error("Failed to dial upstream {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error.
    #[error("Invalid option: {0}")]
    Config(String),
}
