//! Handler abstractions: the raw [`Handler`] trait and the typed adapter
//! that deserializes arguments and serializes replies.

mod registry;

pub use registry::HandlerRegistry;

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::envelope;
use crate::error::Result;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered method implementation.
///
/// Takes the raw argument payload and produces the encoded reply payload.
/// Handler instances are shared across all concurrently served
/// connections, so they must be `Send + Sync` (stateless or internally
/// synchronized).
pub trait Handler: Send + Sync + 'static {
    /// Invoke the handler with raw payload bytes.
    fn call(&self, payload: &[u8]) -> BoxFuture<'static, Result<Bytes>>;
}

/// Wrapper that deserializes the argument before calling the handler and
/// serializes its reply afterwards.
///
/// An argument payload that does not decode as `T` is a handler-level
/// failure: it travels back to the caller inside the response envelope,
/// not as a transport error.
pub struct TypedHandler<F, T, R, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T) -> (Fut, R)>,
}

impl<F, T, R, Fut> TypedHandler<F, T, R, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, R, Fut> Handler for TypedHandler<F, T, R, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    fn call(&self, payload: &[u8]) -> BoxFuture<'static, Result<Bytes>> {
        let parsed: T = match envelope::decode(payload) {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        let fut = (self.handler)(parsed);
        Box::pin(async move {
            let reply = fut.await?;
            Ok(Bytes::from(envelope::encode(&reply)?))
        })
    }
}
