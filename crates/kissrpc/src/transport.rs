//! # Transport
//!
//! Frame I/O over any ordered, reliable, bidirectional byte stream.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: the transport knows nothing about calls or types. It moves
//!   whole frames.
//! - **Self-Framing**: every message is a single top-level kisspack variant, whose header
//!   (tag + u32 length) is the frame boundary. No extra length prefix exists.
//! - **Pre-Connected**: dialing and accepting are the caller's business. Anything that is
//!   `AsyncRead + AsyncWrite` will do: a `TcpStream`, a `UnixStream`, a `DuplexStream`.

use kisspack::Header;
use kisspack::Tag;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;

/// An established connection.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Splits a connection into its framed read and write halves.
pub fn split<T: Transport>(conn: T, config: &Config) -> (FrameReader, FrameWriter) {
    let (reader, writer) = tokio::io::split(conn);
    (
        FrameReader { inner: Box::new(reader), max_frame_len: config.max_frame_len },
        FrameWriter { inner: Box::new(writer) },
    )
}

pub struct FrameReader {
    inner: Box<dyn AsyncRead + Send + Unpin>,
    max_frame_len: u32,
}

impl FrameReader {
    /// Reads one complete frame, header included.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly between frames.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let mut head = [0u8; Header::SIZE];
        let mut filled = 0;
        while filled < head.len() {
            let n = self.inner.read(&mut head[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(Error::ConnectionClosed);
            }
            filled += n;
        }

        let header = Header::parse(&head)?;
        if header.tag != Tag::Variant {
            return Err(Error::ProtocolViolation(format!(
                "frame starts with {:?}, expected a variant",
                header.tag
            )));
        }
        if header.len > self.max_frame_len {
            return Err(Error::FrameTooLarge {
                len: header.body_len(),
                limit: self.max_frame_len as usize,
            });
        }

        let mut frame = vec![0u8; Header::SIZE + header.body_len()];
        frame[..Header::SIZE].copy_from_slice(&head);
        self.inner.read_exact(&mut frame[Header::SIZE..]).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::ConnectionClosed
            } else {
                Error::Io(err)
            }
        })?;
        Ok(Some(frame))
    }
}

pub struct FrameWriter {
    inner: Box<dyn AsyncWrite + Send + Unpin>,
}

impl FrameWriter {
    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.inner.write_all(frame).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shuts down the write side; the peer then reads end-of-stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
