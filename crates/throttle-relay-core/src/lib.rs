//! # Throttle-Relay Core
//!
//! Core library for the throttle-relay service.
//! Relays TCP connections to a single upstream, pacing either direction
//! with fixed-size chunks and a fixed delay.

pub mod config;
pub mod connection;
pub mod error;
pub mod proxy;
pub mod shutdown;

pub use config::{Config, Direction, LoggingConfig, RelayConfig};
pub use connection::{SessionInfo, SessionState};
pub use error::{Error, Result};
pub use proxy::{Acceptor, Sessions, Throttle};
pub use shutdown::{wait_for_interrupt, ShutdownHandle};
