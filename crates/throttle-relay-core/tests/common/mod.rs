//! Common utilities for relay integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use throttle_relay_core::{Acceptor, Direction, RelayConfig, Sessions, ShutdownHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A relay serving on an ephemeral local port.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub shutdown: ShutdownHandle,
    serving: JoinHandle<Sessions>,
}

impl RunningRelay {
    /// Stop accepting and return the sessions still being tracked.
    pub async fn stop(self) -> Sessions {
        self.shutdown.stop();
        self.serving.await.expect("accept loop panicked")
    }
}

/// Relay config listening on an ephemeral port.
pub fn relay_config(
    upstream: SocketAddr,
    direction: Direction,
    chunk_size: usize,
    delay_ms: u64,
) -> RelayConfig {
    RelayConfig {
        listen: "127.0.0.1:0".to_string(),
        upstream: upstream.to_string(),
        chunk_size,
        delay_ms,
        direction,
        drain_timeout_secs: 0,
    }
}

pub async fn start_relay(config: RelayConfig) -> RunningRelay {
    let acceptor = Acceptor::bind(config)
        .await
        .expect("Failed to bind relay");
    let addr = acceptor.local_addr().expect("Failed to get relay addr");
    let shutdown = acceptor.shutdown_handle();
    let serving = tokio::spawn(acceptor.serve());

    RunningRelay {
        addr,
        shutdown,
        serving,
    }
}

/// Echo server on an ephemeral port.
pub async fn start_echo_server() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind echo server");
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if socket.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    (addr, handle)
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Deterministic test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}
