//! Connection server: accept loop and one-shot request serving.
//!
//! The [`Server`] owns a `TcpListener`. Each accepted connection gets its
//! own task, a fresh [`ServerCodec`], and exactly one request/response
//! cycle before the connection is closed; a peer issuing further calls
//! opens a new connection. An accept failure is logged and the loop moves
//! on; one bad accept never stops the server.
//!
//! Handler execution is deliberately unguarded: only the I/O steps around
//! it are deadline-bounded, so a slow job can run for minutes while a
//! stalled peer is cut off in seconds.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

use crate::codec::ServerCodec;
use crate::envelope::{ResponseHeader, DEFAULT_MAX_ENVELOPE_SIZE};
use crate::error::Result;
use crate::guard::DEFAULT_DEADLINE;
use crate::handler::HandlerRegistry;

/// Configuration for a [`Server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub addr: SocketAddr,
    /// Deadline applied independently to every guarded I/O step.
    pub deadline: Duration,
    /// Maximum accepted envelope payload size.
    pub max_envelope_size: u32,
}

impl ServerConfig {
    /// Configuration with the default deadline and envelope limit.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            deadline: DEFAULT_DEADLINE,
            max_envelope_size: DEFAULT_MAX_ENVELOPE_SIZE,
        }
    }

    /// Set the per-step I/O deadline.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set the maximum envelope payload size.
    pub fn max_envelope_size(mut self, max: u32) -> Self {
        self.max_envelope_size = max;
        self
    }
}

/// A bound RPC server ready to serve one-shot connections.
pub struct Server {
    listener: TcpListener,
    registry: Arc<HandlerRegistry>,
    config: ServerConfig,
}

impl Server {
    /// Bind the configured address.
    ///
    /// A bind failure is returned to the caller; at the process entry
    /// point it should be fatal.
    pub async fn bind(config: ServerConfig, registry: HandlerRegistry) -> Result<Self> {
        let listener = TcpListener::bind(config.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, methods = registry.len(), "rpc server listening");

        Ok(Self {
            listener,
            registry: Arc::new(registry),
            config,
        })
    }

    /// The address the listener is actually bound to (useful when the
    /// configured port was 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections indefinitely.
    pub async fn serve(self) -> Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!("error accepting rpc connection: {}", e);
                    continue;
                }
            };

            let registry = self.registry.clone();
            let deadline = self.config.deadline;
            let max_envelope_size = self.config.max_envelope_size;

            tokio::spawn(async move {
                serve_connection(stream, peer, registry, deadline, max_envelope_size).await;
            });
        }
    }
}

/// Serve exactly one request/response cycle, then close the connection
/// regardless of outcome.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<HandlerRegistry>,
    deadline: Duration,
    max_envelope_size: u32,
) {
    let mut codec = ServerCodec::new(stream, deadline).with_max_envelope_size(max_envelope_size);

    if let Err(e) = serve_request(&mut codec, &registry).await {
        tracing::warn!(peer = %peer, "error serving rpc request: {}", e);
    }

    if let Err(e) = codec.close().await {
        tracing::debug!(peer = %peer, "error closing connection: {}", e);
    }
}

/// One cycle: read header, read body, dispatch, write response.
///
/// Dispatch failures (unknown method, undecodable argument, handler
/// errors) are data: they are written into the response envelope over the
/// still-healthy connection. Only guarded-step failures abort the cycle.
async fn serve_request<S>(codec: &mut ServerCodec<S>, registry: &HandlerRegistry) -> Result<()>
where
    S: AsyncRead + AsyncWrite,
{
    let header = codec.read_request_header().await?;
    let body = codec.read_request_body().await?;

    tracing::debug!(method = %header.method, seq = header.seq, "dispatching");

    // Handler execution is not bounded by the deadline guard.
    match registry.dispatch(&header.method, &body).await {
        Ok(reply) => {
            codec
                .write_response(&ResponseHeader::ok(header.seq), &reply)
                .await
        }
        Err(e) => {
            codec
                .write_response_value(&ResponseHeader::err(header.seq, e.to_string()), &())
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{
        read_envelope, read_envelope_bytes, write_envelope, write_envelope_bytes, RequestHeader,
    };
    use crate::error::RpcError;
    use tokio::io::duplex;

    fn echo_registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register("Echo.Say", |msg: String| async move { Ok(msg) });
        registry
    }

    #[tokio::test]
    async fn serves_one_cycle_over_duplex() {
        let (client, server) = duplex(4096);
        let mut codec = ServerCodec::new(server, Duration::from_secs(5));
        let registry = echo_registry();

        let (mut client_read, mut client_write) = tokio::io::split(client);
        write_envelope(
            &mut client_write,
            &RequestHeader {
                method: "Echo.Say".to_string(),
                seq: 11,
            },
        )
        .await
        .unwrap();
        let arg = crate::envelope::encode(&"ping").unwrap();
        write_envelope_bytes(&mut client_write, &arg).await.unwrap();

        serve_request(&mut codec, &registry).await.unwrap();

        let header: ResponseHeader = read_envelope(&mut client_read, DEFAULT_MAX_ENVELOPE_SIZE)
            .await
            .unwrap();
        assert_eq!(header.seq, 11);
        assert!(header.error.is_none());

        let reply = read_envelope_bytes(&mut client_read, DEFAULT_MAX_ENVELOPE_SIZE)
            .await
            .unwrap();
        let decoded: String = crate::envelope::decode(&reply).unwrap();
        assert_eq!(decoded, "ping");
    }

    #[tokio::test]
    async fn unknown_method_answered_in_envelope() {
        let (client, server) = duplex(4096);
        let mut codec = ServerCodec::new(server, Duration::from_secs(5));
        let registry = echo_registry();

        let (mut client_read, mut client_write) = tokio::io::split(client);
        write_envelope(
            &mut client_write,
            &RequestHeader {
                method: "Nope.Missing".to_string(),
                seq: 2,
            },
        )
        .await
        .unwrap();
        let arg = crate::envelope::encode(&()).unwrap();
        write_envelope_bytes(&mut client_write, &arg).await.unwrap();

        // The cycle itself succeeds; the failure travels as data.
        serve_request(&mut codec, &registry).await.unwrap();

        let header: ResponseHeader = read_envelope(&mut client_read, DEFAULT_MAX_ENVELOPE_SIZE)
            .await
            .unwrap();
        assert_eq!(header.seq, 2);
        let message = header.error.expect("error expected");
        assert!(message.contains("Nope.Missing"));
    }

    #[tokio::test]
    async fn guarded_step_failure_aborts_cycle() {
        let (client, server) = duplex(4096);
        let mut codec = ServerCodec::new(server, Duration::from_millis(50));
        let registry = echo_registry();

        // Client connects but never sends a request.
        let result = serve_request(&mut codec, &registry).await;
        assert!(matches!(result, Err(RpcError::Timeout(_))));
        drop(client);
    }
}
