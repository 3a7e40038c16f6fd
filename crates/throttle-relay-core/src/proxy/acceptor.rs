//! Listening socket and accept loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::proxy::session;
use crate::shutdown::ShutdownHandle;

/// Pause after a failed accept; errors like EMFILE repeat until fds free up.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts clients and spawns one session per connection.
pub struct Acceptor {
    /// Bound listening socket.
    listener: TcpListener,

    /// Shared read-only configuration.
    config: Arc<RelayConfig>,

    /// Stops the accept loop.
    shutdown: ShutdownHandle,
}

impl Acceptor {
    /// Bind the listening socket on `config.listen`; `:port` binds every interface.
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        let listen_addr = config.listen_addr();
        let listener = TcpListener::bind(&listen_addr)
            .await
            .map_err(|source| Error::Bind {
                addr: listen_addr.clone(),
                source,
            })?;
        info!("Relay listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            config: Arc::new(config),
            shutdown: ShutdownHandle::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle that makes [`serve`](Self::serve) return.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accept connections until stopped, then close the listening socket.
    ///
    /// Sessions still running at that point keep going; the returned
    /// [`Sessions`] can wait for them.
    pub async fn serve(self) -> Sessions {
        let Acceptor {
            listener,
            config,
            shutdown,
        } = self;
        let tracker = TaskTracker::new();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.stopped() => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, client_addr)) => {
                        info!("Accepted {}", client_addr);
                        let config = Arc::clone(&config);
                        let span = info_span!("session", client = %client_addr);

                        tracker.spawn(
                            async move {
                                match session::handle(stream, client_addr, config).await {
                                    Ok(session) => info!(
                                        "Session closed: {} -> {} (sent: {}, recv: {}, {}ms)",
                                        session.client_addr,
                                        session.upstream_addr,
                                        session.bytes_to_upstream,
                                        session.bytes_to_client,
                                        session.duration_ms()
                                    ),
                                    Err(e) => warn!("Session from {} failed: {}", client_addr, e),
                                }
                            }
                            .instrument(span),
                        );
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        if accept_backoff(&shutdown).await {
                            break;
                        }
                    }
                },
            }
        }

        drop(listener);
        info!("Stopped accepting connections ({} sessions running)", tracker.len());
        Sessions { tracker }
    }
}

/// Sleep [`ACCEPT_ERROR_BACKOFF`], returning `true` early if stopped meanwhile.
async fn accept_backoff(shutdown: &ShutdownHandle) -> bool {
    tokio::select! {
        _ = shutdown.stopped() => true,
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => false,
    }
}

/// Sessions spawned by an [`Acceptor`].
#[derive(Debug, Clone)]
pub struct Sessions {
    tracker: TaskTracker,
}

impl Sessions {
    /// Number of sessions still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Wait up to `timeout` for every session to finish.
    ///
    /// Returns `false` if some were still running when the timeout elapsed.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_accept_backoff_waits() {
        let shutdown = ShutdownHandle::new();
        let started = Instant::now();

        assert!(!accept_backoff(&shutdown).await);
        assert!(started.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }

    #[tokio::test]
    async fn test_accept_backoff_ends_on_stop() {
        let shutdown = ShutdownHandle::new();
        let stopper = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            stopper.stop();
        });

        let stopped = tokio::time::timeout(Duration::from_secs(1), async {
            // Loop like repeated accept failures would.
            loop {
                if accept_backoff(&shutdown).await {
                    return true;
                }
            }
        })
        .await
        .unwrap();
        assert!(stopped);
    }

    #[tokio::test]
    async fn test_bind_port_only_listens_on_all_interfaces() {
        let config = RelayConfig {
            listen: ":0".into(),
            upstream: ":1".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let acceptor = Acceptor::bind(config).await.unwrap();
        let addr = acceptor.local_addr().unwrap();
        assert!(addr.ip().is_unspecified());
        assert_ne!(addr.port(), 0);
    }
}
