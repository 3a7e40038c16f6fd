//! A single relay session: one client stream paired with one upstream stream.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::connection::SessionInfo;
use crate::error::{Error, Result};
use crate::proxy::relay::Copier;

/// One direction of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Path {
    ClientToUpstream,
    UpstreamToClient,
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::ClientToUpstream => f.write_str("client -> upstream"),
            Path::UpstreamToClient => f.write_str("upstream -> client"),
        }
    }
}

/// Relay one accepted client through a freshly dialed upstream.
///
/// Returns once both directions have finished; both streams are closed by
/// then. A dial failure drops the client stream and returns
/// [`Error::Dial`].
pub async fn handle(
    client: TcpStream,
    client_addr: SocketAddr,
    config: Arc<RelayConfig>,
) -> Result<SessionInfo> {
    let upstream_addr = config.upstream_addr();
    let mut session = SessionInfo::new(client_addr, upstream_addr.clone(), config.direction);
    client.set_nodelay(true)?;

    let upstream = TcpStream::connect(&upstream_addr)
        .await
        .map_err(|source| Error::Dial {
            addr: upstream_addr.clone(),
            source,
        })?;
    upstream.set_nodelay(true)?;

    session.set_active();
    debug!(
        "Session {} relaying {} <-> {} (throttle: {})",
        session.id, client_addr, upstream_addr, config.direction
    );

    let (forward, reverse) = config.direction.copiers(config.throttle());
    let (client_read, client_write) = client.into_split();
    let (upstream_read, upstream_write) = upstream.into_split();
    let cancel = CancellationToken::new();

    let (bytes_to_upstream, bytes_to_client) = tokio::join!(
        pump(
            Path::ClientToUpstream,
            forward,
            client_read,
            upstream_write,
            cancel.clone()
        ),
        pump(
            Path::UpstreamToClient,
            reverse,
            upstream_read,
            client_write,
            cancel.clone()
        ),
    );

    session.set_closed(bytes_to_upstream, bytes_to_client);
    Ok(session)
}

/// Drive one direction until end-of-stream, failure or cancellation.
///
/// End-of-stream half-closes `writer` so the peer sees it too. A failure
/// cancels the session so the other direction is released at once.
async fn pump<R, W>(
    path: Path,
    copier: Copier,
    mut reader: R,
    mut writer: W,
    cancel: CancellationToken,
) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut copied = 0;

    let outcome = tokio::select! {
        result = copier.copy(&mut reader, &mut writer, &mut copied) => Some(result),
        _ = cancel.cancelled() => None,
    };

    match outcome {
        Some(Ok(())) => {
            debug!("{}: end of stream", path);
            let _ = writer.shutdown().await;
        }
        Some(Err(e)) => {
            if copier.is_throttled() {
                warn!("{}: {}", path, e);
            } else {
                debug!("{}: {}", path, e);
            }
            cancel.cancel();
        }
        None => debug!("{}: cancelled", path),
    }

    copied
}
