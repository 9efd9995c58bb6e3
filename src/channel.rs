//! Newline-delimited text transport over a single byte stream.
//!
//! A [`LineChannel`] is the only thing a session or the client knows about
//! its connection. It can be split into a [`LineReader`] and a [`LineWriter`]
//! so the two directions can live in different tasks.

use std::io;

use futures::stream::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// Longest line accepted from a peer unless configured otherwise, in bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 8 * 1024;

pub struct LineReader<R> {
    frames: FramedRead<R, LinesCodec>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_line_len(reader, DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_line_len(reader: R, max_line_len: usize) -> Self {
        Self {
            frames: FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_len)),
        }
    }

    /// Reads the next line without its terminator (`\n` or `\r\n`).
    ///
    /// Returns `Ok(None)` once the peer has closed its side. A line longer
    /// than the limit, or one that is not UTF-8, is an `InvalidData` error.
    /// Cancel safe, so it can sit in a `select!` branch.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        match self.frames.next().await {
            None => Ok(None),
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(LinesCodecError::Io(err))) => Err(err),
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "line exceeds maximum length",
            )),
        }
    }
}

pub struct LineWriter<W> {
    writer: W,
    closed: bool,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            closed: false,
        }
    }

    /// Writes `line` followed by `\n` and flushes.
    pub async fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "line channel already closed",
            ));
        }

        if line.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "line must not contain an embedded newline",
            ));
        }

        let mut frame = String::with_capacity(line.len() + 1);
        frame.push_str(line);
        frame.push('\n');

        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.flush().await
    }

    /// Shuts the write side down. Only the first call touches the stream.
    pub async fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.writer.shutdown().await
    }
}

pub struct LineChannel<R, W> {
    reader: LineReader<R>,
    writer: LineWriter<W>,
}

impl<R, W> LineChannel<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_max_line_len(reader, writer, DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_line_len(reader: R, writer: W, max_line_len: usize) -> Self {
        Self {
            reader: LineReader::with_max_line_len(reader, max_line_len),
            writer: LineWriter::new(writer),
        }
    }

    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.reader.read_line().await
    }

    pub async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_line(line).await
    }

    pub async fn close(&mut self) -> io::Result<()> {
        self.writer.close().await
    }

    /// Borrows both halves at once, for loops that read and write concurrently.
    pub fn halves(&mut self) -> (&mut LineReader<R>, &mut LineWriter<W>) {
        (&mut self.reader, &mut self.writer)
    }

    pub fn into_split(self) -> (LineReader<R>, LineWriter<W>) {
        (self.reader, self.writer)
    }
}

impl LineChannel<OwnedReadHalf, OwnedWriteHalf> {
    pub fn from_tcp(stream: TcpStream, max_line_len: usize) -> Self {
        let (reader, writer) = stream.into_split();
        Self::with_max_line_len(reader, writer, max_line_len)
    }
}

impl<T> LineChannel<ReadHalf<T>, WriteHalf<T>>
where
    T: AsyncRead + AsyncWrite,
{
    /// Wraps any bidirectional stream, e.g. an in-memory `tokio::io::duplex`.
    pub fn from_stream(stream: T) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer)
    }
}
