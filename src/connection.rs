// ABOUTME: Provides frame-based I/O over any async byte stream for SMPP v3.4 sessions
// ABOUTME: Buffers reads until whole PDUs are available and batches writes through BufWriter

use crate::codec::CodecError;
use crate::frame::Frame;
use crate::pdu::Pdu;
use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};

const READ_BUFFER_SIZE: usize = 4 * 1024;

/// Frame-based communication over a transport such as a `TcpStream`.
///
/// `Connection` handles framing only. Session state, sequence numbers and
/// correlation live in [`crate::client::Session`], which splits the
/// connection into a [`FrameReader`] and a [`FrameWriter`] so that reading
/// and writing proceed independently.
#[derive(Debug)]
pub struct Connection<T> {
    reader: FrameReader<ReadHalf<T>>,
    writer: FrameWriter<WriteHalf<T>>,
}

impl<T: AsyncRead + AsyncWrite> Connection<T> {
    pub fn new(stream: T) -> Connection<T> {
        let (read, write) = tokio::io::split(stream);
        Connection {
            reader: FrameReader::new(read),
            writer: FrameWriter::new(write),
        }
    }

    /// Read a single frame. `None` means the peer closed cleanly.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        self.reader.read_frame().await
    }

    pub async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.writer.write_frame(frame).await
    }

    /// Encode and write one PDU
    pub async fn write_pdu(&mut self, pdu: &Pdu) -> Result<(), CodecError> {
        let bytes = pdu.encode()?;
        self.writer.write_frame(&bytes).await?;
        Ok(())
    }

    pub fn into_split(self) -> (FrameReader<ReadHalf<T>>, FrameWriter<WriteHalf<T>>) {
        (self.reader, self.writer)
    }
}

/// Read half of a [`Connection`]
#[derive(Debug)]
pub struct FrameReader<R> {
    stream: R,
    // Bytes received but not yet returned as a frame
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R) -> FrameReader<R> {
        FrameReader {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    /// Read a single `Frame` from the underlying stream.
    ///
    /// Waits until enough data is buffered for a whole frame. Anything left
    /// in the buffer afterwards is kept for the next call.
    ///
    /// # Returns
    ///
    /// `None` if the stream closed on a frame boundary. A close in the middle
    /// of a frame is a `ConnectionReset` I/O error; an invalid
    /// `command_length` is `InvalidPduLength`. Both are fatal.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        loop {
            if let Some(frame) = Frame::parse(&mut self.buffer)? {
                return Ok(Some(frame));
            }

            // `0` indicates end of stream
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(CodecError::Io(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )));
            }
        }
    }
}

/// Write half of a [`Connection`]
#[derive(Debug)]
pub struct FrameWriter<W> {
    stream: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(stream: W) -> FrameWriter<W> {
        FrameWriter {
            stream: BufWriter::new(stream),
        }
    }

    /// Write one encoded frame and flush it to the socket
    pub async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
