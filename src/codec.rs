//! Per-connection codec with deadline-guarded envelope I/O.
//!
//! A [`ServerCodec`] wraps one accepted connection and performs the four
//! guarded steps of a request/response cycle: read the request header,
//! read the request body, write the response header, write the response
//! body. Each step is routed through [`guard`] with its own deadline and
//! diagnostic label.
//!
//! A codec that reports a timeout is permanently retired: the guarded
//! operation was cancelled mid-envelope, so the stream cannot be
//! resynchronized. The serving loop closes the codec unconditionally
//! after each cycle, success or failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{split, AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};

use crate::envelope::{
    self, read_envelope, read_envelope_bytes, write_envelope, write_envelope_bytes, RequestHeader,
    ResponseHeader, DEFAULT_MAX_ENVELOPE_SIZE,
};
use crate::error::Result;
use crate::guard::guard;

/// Stateful adapter around one open connection.
///
/// Generic over the stream type so tests can drive it with
/// `tokio::io::duplex` instead of a real socket.
pub struct ServerCodec<S> {
    reader: ReadHalf<S>,
    writer: BufWriter<WriteHalf<S>>,
    deadline: Duration,
    max_envelope_size: u32,
    closed: AtomicBool,
}

impl<S> ServerCodec<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Wrap `stream` with the given per-step deadline.
    pub fn new(stream: S, deadline: Duration) -> Self {
        let (reader, writer) = split(stream);
        Self {
            reader,
            writer: BufWriter::new(writer),
            deadline,
            max_envelope_size: DEFAULT_MAX_ENVELOPE_SIZE,
            closed: AtomicBool::new(false),
        }
    }

    /// Override the maximum accepted envelope size.
    pub fn with_max_envelope_size(mut self, max: u32) -> Self {
        self.max_envelope_size = max;
        self
    }

    /// Guarded read of the next request header.
    pub async fn read_request_header(&mut self) -> Result<RequestHeader> {
        guard(
            read_envelope(&mut self.reader, self.max_envelope_size),
            "server read request header",
            self.deadline,
        )
        .await
    }

    /// Guarded read of the argument payload that follows the header.
    pub async fn read_request_body(&mut self) -> Result<Bytes> {
        guard(
            read_envelope_bytes(&mut self.reader, self.max_envelope_size),
            "server read request body",
            self.deadline,
        )
        .await
    }

    /// Guarded write of a complete response: header, then body, then flush.
    ///
    /// If writing the header fails, a flush is attempted anyway to probe
    /// whether the connection is already broken. If the flush reports no
    /// error the stream is still reachable, meaning the peer could be left
    /// with a half-written response; the failure is logged and the codec
    /// closed so it never is. Same policy for a body failure after the
    /// header went out.
    pub async fn write_response(&mut self, header: &ResponseHeader, body: &[u8]) -> Result<()> {
        if let Err(e) = guard(
            write_envelope(&mut self.writer, header),
            "server write response",
            self.deadline,
        )
        .await
        {
            if self.writer.flush().await.is_ok() {
                tracing::error!("rpc: error writing response header: {}", e);
                let _ = self.close().await;
            }
            return Err(e);
        }

        if let Err(e) = guard(
            write_envelope_bytes(&mut self.writer, body),
            "server write response body",
            self.deadline,
        )
        .await
        {
            if self.writer.flush().await.is_ok() {
                tracing::error!("rpc: error writing response body: {}", e);
                let _ = self.close().await;
            }
            return Err(e);
        }

        self.writer.flush().await?;
        Ok(())
    }

    /// Encode `value` and write it as a complete response.
    pub async fn write_response_value<T: serde::Serialize>(
        &mut self,
        header: &ResponseHeader,
        value: &T,
    ) -> Result<()> {
        let body = envelope::encode(value)?;
        self.write_response(header, &body).await
    }

    /// Close the underlying stream, at most once with effect.
    ///
    /// The first call shuts down the write half and surfaces its failure,
    /// if any; every later call is a successful no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
