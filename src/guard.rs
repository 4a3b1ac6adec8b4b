//! Deadline guard for blocking I/O steps.
//!
//! Every read/write a codec performs goes through [`guard`], which races the
//! operation against a fixed wall-clock deadline. If the deadline elapses
//! first the operation's future is dropped (the I/O is cancelled, not
//! leaked) and the caller gets [`RpcError::Timeout`] carrying the step's
//! diagnostic label.
//!
//! A timed-out stream may have been left mid-envelope, so callers must
//! treat a timeout as connection-ending: close the codec, never decode
//! from the stream again.
//!
//! # Example
//!
//! ```ignore
//! let header = guard(
//!     read_envelope(&mut reader, max),
//!     "server read request header",
//!     config.deadline,
//! )
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, RpcError};

/// Default deadline applied to each guarded I/O step.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// Run `op` to completion unless `deadline` elapses first.
///
/// Returns the operation's own result if it finishes in time, otherwise
/// `Timeout(label)`. The deadline applies to this single step only, not
/// end-to-end across a whole request.
pub async fn guard<F, T>(op: F, label: &'static str, deadline: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, op).await {
        Ok(result) => result,
        Err(_) => Err(RpcError::Timeout(label)),
    }
}
