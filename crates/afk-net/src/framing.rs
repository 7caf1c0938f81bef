//! Length-prefixed framing for TCP streams.
//!
//! Every message on the wire is a length-prefixed frame:
//!
//! ```text
//! +-------------------+--------------------+
//! | length (4 bytes)  |   payload          |
//! | u32 little-endian |   (length bytes)   |
//! +-------------------+--------------------+
//! ```
//!
//! The length does not include the prefix itself. [`FrameReader`] and
//! [`FrameWriter`] own one half of a stream each and speak whole
//! [`WireMessage`]s on top of the frames.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::messages::{self, MessageError, WireMessage};

/// Configuration for the framing layer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum allowed payload size in bytes. Default: 1 MiB.
    pub max_payload_size: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 1_048_576,
        }
    }
}

/// Errors that can occur during framing operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload size exceeds the configured maximum.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// The actual payload size.
        size: u32,
        /// The configured maximum.
        max: u32,
    },

    /// The connection was closed before a complete frame was received.
    #[error("connection closed")]
    ConnectionClosed,

    /// The frame arrived intact but its payload did not decode.
    #[error("bad message: {0}")]
    Message(#[from] MessageError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn eof_as_closed(e: std::io::Error) -> FrameError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::ConnectionClosed
    } else {
        FrameError::Io(e)
    }
}

/// Reads frames from the read half of a stream.
pub struct FrameReader<R> {
    inner: R,
    config: FrameConfig,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read one frame's payload. Not cancel-safe: a partially read frame is
    /// lost if the future is dropped.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>, FrameError> {
        let mut len_buf = [0u8; 4];
        self.inner
            .read_exact(&mut len_buf)
            .await
            .map_err(eof_as_closed)?;

        let payload_len = u32::from_le_bytes(len_buf);
        if payload_len > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload_len,
                max: self.config.max_payload_size,
            });
        }

        let mut payload = vec![0u8; payload_len as usize];
        if payload_len > 0 {
            self.inner
                .read_exact(&mut payload)
                .await
                .map_err(eof_as_closed)?;
        }
        Ok(payload)
    }

    /// Read and decode one message.
    pub async fn read_message(&mut self) -> Result<WireMessage, FrameError> {
        let payload = self.read_frame().await?;
        Ok(messages::decode(&payload)?)
    }
}

/// Writes frames to the write half of a stream.
pub struct FrameWriter<W> {
    inner: W,
    config: FrameConfig,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Write one payload with its length prefix and flush.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<(), FrameError> {
        let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
        if len > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: self.config.max_payload_size,
            });
        }

        self.inner.write_all(&len.to_le_bytes()).await?;
        if !payload.is_empty() {
            self.inner.write_all(payload).await?;
        }
        self.inner.flush().await?;
        Ok(())
    }

    /// Encode and write one message.
    pub async fn send(&mut self, msg: &WireMessage) -> Result<(), FrameError> {
        let payload = messages::encode(msg)?;
        self.write_frame(&payload).await
    }
}
