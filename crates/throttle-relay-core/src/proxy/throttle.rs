//! Rate-limited copy: fixed-size chunks with a fixed pause after each one.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Read buffer size for throttled paths.
pub const BUF_SIZE: usize = 16 * 1024;

/// Pacing parameters for a throttled path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    chunk_size: usize,
    delay: Duration,
}

impl Throttle {
    /// A chunk size of zero is treated as one.
    pub fn new(chunk_size: usize, delay: Duration) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            delay,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of pauses needed to forward `len` bytes.
    pub fn chunks_for(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size)
    }
}

/// Copy `reader` into `writer`, at most `chunk_size` bytes per write and
/// sleeping `delay` after every write.
///
/// Returns `Ok(())` on end-of-stream. `copied` tracks the bytes written so
/// far and stays valid if the future is dropped part way through.
pub async fn throttle_copy<R, W>(
    reader: &mut R,
    writer: &mut W,
    throttle: Throttle,
    copied: &mut u64,
) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; BUF_SIZE];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) => return Err(Error::Read(e)),
        };

        for chunk in buf[..n].chunks(throttle.chunk_size) {
            writer.write_all(chunk).await.map_err(Error::Write)?;
            *copied += chunk.len() as u64;

            if !throttle.delay.is_zero() {
                tokio::time::sleep(throttle.delay).await;
            }
        }
    }
}
