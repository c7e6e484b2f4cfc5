//! Wire framing
//!
//! One JSON document per newline-terminated frame over a byte stream. The
//! reader buffers into a `BytesMut` and splits on `\n`; a frame that grows
//! past the configured maximum without a terminator kills the connection
//! rather than the process.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, ProtocolError, Result};

/// Default maximum frame size in bytes
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Buffered frame reader over any byte stream
pub struct FrameReader<R> {
    inner: R,
    buffer: BytesMut,
    max_frame_size: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a stream with the given frame size limit
    pub fn new(inner: R, max_frame_size: usize) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(4 * 1024),
            max_frame_size,
        }
    }

    /// Read the next frame as parsed JSON
    ///
    /// Returns `Ok(None)` on clean end of stream. EOF in the middle of a
    /// frame is `ProtocolError::ConnectionClosed`; a syntactically invalid
    /// frame is `ProtocolError::Malformed`.
    pub async fn next_frame(&mut self) -> Result<Option<serde_json::Value>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line = self.buffer.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                if line.is_empty() {
                    continue;
                }

                let value = serde_json::from_slice(&line).map_err(|e| {
                    Error::Protocol(ProtocolError::Malformed(e.to_string()))
                })?;
                return Ok(Some(value));
            }

            if self.buffer.len() > self.max_frame_size {
                return Err(Error::Protocol(ProtocolError::FrameTooLarge(
                    self.buffer.len(),
                )));
            }

            self.buffer.reserve(4 * 1024);
            let read = self.inner.read_buf(&mut self.buffer).await?;
            if read == 0 {
                if self.buffer.has_remaining() {
                    return Err(Error::Protocol(ProtocolError::ConnectionClosed));
                }
                return Ok(None);
            }
        }
    }
}

/// Serialize one value and write it as a newline-terminated frame
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let mut encoded = serde_json::to_vec(value)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}
