//! Line-delimited transport for the MCP relay.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! The transport is generic over its reader and writer so the relay can be
//! driven from in-memory buffers in tests; [`StdioTransport`] is the
//! production instantiation.
//!
//! # Cancellation
//!
//! [`LineTransport::read_line`] is cancellation safe: it is polled inside a
//! `tokio::select!` alongside task completions and shutdown signals, and a
//! partially read line stays in the transport's buffer for the next call.
//!
//! # Encoding
//!
//! Lines are returned as raw bytes. A line that is not valid UTF-8 is still a
//! line; rejecting it is the dispatcher's job, so one bad line never stops
//! the stream.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::protocol::OutgoingMessage;

/// A newline-delimited JSON-RPC transport.
pub struct LineTransport<R, W> {
    /// Buffered input.
    reader: BufReader<R>,
    /// Bytes of the line currently being read.
    pending: Vec<u8>,
    /// Output sink.
    writer: W,
}

/// The transport over the process's stdin and stdout.
pub type StdioTransport = LineTransport<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a transport over stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over an arbitrary reader and writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            writer,
        }
    }

    /// Reads the next non-blank line with surrounding whitespace removed.
    ///
    /// Whitespace-only lines are skipped. Returns `None` once the input is
    /// closed (EOF). The bytes are not checked for UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the underlying input fails.
    pub async fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            // read_until appends to `pending`, so a cancelled call loses nothing.
            let read = self.reader.read_until(b'\n', &mut self.pending).await?;
            if read == 0 && self.pending.is_empty() {
                return Ok(None);
            }

            let raw = std::mem::take(&mut self.pending);
            let line = trim_whitespace(&raw);
            if !line.is_empty() {
                return Ok(Some(line.to_vec()));
            }
            if read == 0 {
                return Ok(None);
            }
        }
    }

    /// Writes one message as a single newline-terminated JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_message(&mut self, message: &OutgoingMessage) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    /// Writes a raw JSON string with newline termination and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        // MCP stdio framing: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Flushes any buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }

    /// Consumes the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
