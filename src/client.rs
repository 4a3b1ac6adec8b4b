//! One-shot RPC client.
//!
//! [`call`] opens a connection, performs a single request/response cycle
//! with every read/write deadline-guarded, and drops the connection. There
//! is no pooling or pipelining; concurrent calls each open their own
//! connection.
//!
//! # Example
//!
//! ```ignore
//! let reply: String = client::call(addr, "Worker.DoJob", &"42".to_string()).await?;
//! assert_eq!(reply, "OK");
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::envelope::{
    self, read_envelope, read_envelope_bytes, write_envelope, RequestHeader, ResponseHeader,
    DEFAULT_MAX_ENVELOPE_SIZE,
};
use crate::error::{Result, RpcError};
use crate::guard::{guard, DEFAULT_DEADLINE};

// Uniqueness is all that matters here, not ordering across threads.
static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_seq() -> u64 {
    NEXT_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Call `method` on the server at `addr` with the default deadline.
pub async fn call<A, T, R>(addr: A, method: &str, args: &T) -> Result<R>
where
    A: ToSocketAddrs,
    T: Serialize,
    R: DeserializeOwned,
{
    call_with_deadline(addr, method, args, DEFAULT_DEADLINE).await
}

/// Call `method` on the server at `addr`, bounding each I/O step by
/// `deadline`.
///
/// A populated `error` field in the response envelope comes back as
/// [`RpcError::Remote`]; a server that times us out simply closes the
/// connection, which surfaces here as an I/O failure.
pub async fn call_with_deadline<A, T, R>(
    addr: A,
    method: &str,
    args: &T,
    deadline: Duration,
) -> Result<R>
where
    A: ToSocketAddrs,
    T: Serialize,
    R: DeserializeOwned,
{
    let stream = TcpStream::connect(addr).await?;
    let (mut reader, write_half) = stream.into_split();
    let mut writer = BufWriter::new(write_half);

    let seq = next_seq();
    let header = RequestHeader {
        method: method.to_string(),
        seq,
    };

    guard(
        write_envelope(&mut writer, &header),
        "client write request",
        deadline,
    )
    .await?;
    guard(
        write_envelope(&mut writer, args),
        "client write request body",
        deadline,
    )
    .await?;
    writer.flush().await?;

    let response: ResponseHeader = guard(
        read_envelope(&mut reader, DEFAULT_MAX_ENVELOPE_SIZE),
        "client read response header",
        deadline,
    )
    .await?;
    let body = guard(
        read_envelope_bytes(&mut reader, DEFAULT_MAX_ENVELOPE_SIZE),
        "client read response body",
        deadline,
    )
    .await?;

    if response.seq != seq {
        return Err(RpcError::Envelope(format!(
            "response seq {} does not match request seq {}",
            response.seq, seq
        )));
    }

    if let Some(message) = response.error {
        return Err(RpcError::Remote(message));
    }

    envelope::decode(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_unique() {
        let a = next_seq();
        let b = next_seq();
        let c = next_seq();
        assert!(a < b && b < c);
    }
}
