//! Plain relay and per-direction copier selection.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Direction;
use crate::error::Result;
use crate::proxy::throttle::{throttle_copy, Throttle};

/// Relay `reader` into `writer` with no pacing until end-of-stream.
pub async fn passthrough_copy<R, W>(reader: &mut R, writer: &mut W, copied: &mut u64) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = [0u8; 8192];

    loop {
        match reader.read(&mut buf).await? {
            0 => return Ok(()),
            n => {
                writer.write_all(&buf[..n]).await?;
                *copied += n as u64;
            }
        }
    }
}

/// How one direction of a session moves its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Copier {
    Passthrough,
    Throttled(Throttle),
}

impl Copier {
    pub fn is_throttled(&self) -> bool {
        matches!(self, Copier::Throttled(_))
    }

    /// Run this copier until end-of-stream or the first error.
    pub async fn copy<R, W>(&self, reader: &mut R, writer: &mut W, copied: &mut u64) -> Result<()>
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        match self {
            Copier::Passthrough => passthrough_copy(reader, writer, copied).await,
            Copier::Throttled(throttle) => throttle_copy(reader, writer, *throttle, copied).await,
        }
    }
}

impl Direction {
    /// Copiers for (client -> upstream, upstream -> client).
    pub fn copiers(&self, throttle: Throttle) -> (Copier, Copier) {
        let throttled = Copier::Throttled(throttle);
        match self {
            Direction::ClientToServer => (throttled, Copier::Passthrough),
            Direction::ServerToClient => (Copier::Passthrough, throttled),
            Direction::None => (Copier::Passthrough, Copier::Passthrough),
            Direction::Both => (throttled, throttled),
        }
    }
}
