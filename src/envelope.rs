//! Envelope types and wire framing.
//!
//! One request/response cycle exchanges two envelopes in each direction:
//! a header, then a body. On the wire each envelope is a Big Endian `u32`
//! length prefix followed by one MessagePack value (`to_vec_named`, so
//! structs travel as self-describing maps). The length is validated
//! against a configured maximum before any allocation.
//!
//! Headers are typed ([`RequestHeader`], [`ResponseHeader`]); bodies move
//! through the codec as opaque [`Bytes`] and are decoded by whoever knows
//! their type (the typed handler on the server, the caller on the client).

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, RpcError};

/// Length prefix size in bytes.
pub const LEN_PREFIX_SIZE: usize = 4;

/// Default maximum envelope payload size (16 MB).
pub const DEFAULT_MAX_ENVELOPE_SIZE: u32 = 16 * 1024 * 1024;

/// Request envelope header: which method to invoke, and the caller's
/// sequence number, echoed back in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Method name in `"Type.Method"` form.
    pub method: String,
    /// Caller-chosen sequence number.
    pub seq: u64,
}

/// Response envelope header. `error: None` means success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Sequence number echoed from the request.
    pub seq: u64,
    /// Handler or dispatch error, reported as data rather than as a
    /// transport failure.
    pub error: Option<String>,
}

impl ResponseHeader {
    /// Success header for the given sequence number.
    pub fn ok(seq: u64) -> Self {
        Self { seq, error: None }
    }

    /// Error header for the given sequence number.
    pub fn err(seq: u64, error: impl Into<String>) -> Self {
        Self {
            seq,
            error: Some(error.into()),
        }
    }
}

/// Encode a value to MsgPack bytes (struct-as-map format).
#[inline]
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode MsgPack bytes to a value.
#[inline]
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Read one envelope's raw payload: length prefix, size check, payload.
pub async fn read_envelope_bytes<R>(reader: &mut R, max_size: u32) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LEN_PREFIX_SIZE];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);

    if len > max_size {
        return Err(RpcError::Envelope(format!(
            "envelope size {} exceeds maximum {}",
            len, max_size
        )));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Bytes::from(payload))
}

/// Read one envelope and decode its payload as `T`.
pub async fn read_envelope<R, T>(reader: &mut R, max_size: u32) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let payload = read_envelope_bytes(reader, max_size).await?;
    decode(&payload)
}

/// Write one envelope from pre-encoded payload bytes. Does not flush.
pub async fn write_envelope_bytes<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    Ok(())
}

/// Encode `value` and write it as one envelope. Does not flush.
pub async fn write_envelope<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = encode(value)?;
    write_envelope_bytes(writer, &payload).await
}
