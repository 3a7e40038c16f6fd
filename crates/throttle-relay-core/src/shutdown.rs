//! Shutdown trigger for the accept loop.

use std::future::Future;
use std::io;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Tells an [`Acceptor`](crate::proxy::Acceptor) to stop accepting.
///
/// Cloning is cheap; every clone observes the same stop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop accepting new connections. Running sessions are not touched.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once [`stop`](Self::stop) has been called.
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }
}

/// Wait for one interrupt signal, then stop the acceptor.
pub async fn wait_for_interrupt(handle: ShutdownHandle) {
    stop_on(tokio::signal::ctrl_c(), handle).await;
}

/// Stop `handle` once `signal` fires. A signal that fails to install
/// leaves the acceptor running.
async fn stop_on<F>(signal: F, handle: ShutdownHandle)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for interrupt signal: {}", e);
        return;
    }
    info!("Received shutdown signal");
    handle.stop();
}
