//! Handler registry mapping method names to handlers.
//!
//! The registry is an explicit object constructed by the embedding
//! application and handed to the server at bind time. Nothing is
//! registered process-wide, so several independent servers (and tests)
//! can coexist in one process.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = HandlerRegistry::new();
//! registry.register("Worker.DoJob", |task: String| async move {
//!     Ok(format!("done: {task}"))
//! });
//! ```

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Handler, TypedHandler};
use crate::error::{Result, RpcError};

/// Registry mapping `"Type.Method"` names to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    methods: HashMap<String, Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a typed method handler under `name`.
    ///
    /// The handler takes the deserialized argument and returns the reply
    /// value; a returned error is reported to the caller inside the
    /// response envelope. Registering the same name twice replaces the
    /// previous handler.
    pub fn register<F, T, R, Fut>(&mut self, name: &str, handler: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.methods
            .insert(name.to_string(), Box::new(TypedHandler::new(handler)));
    }

    /// Get a handler by method name.
    pub fn get(&self, name: &str) -> Option<&dyn Handler> {
        self.methods.get(name).map(|h| h.as_ref())
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the registry has no methods.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Resolve `method` and invoke its handler with the raw payload.
    ///
    /// Returns `MethodNotFound` for unregistered names; the server turns
    /// that (like any handler failure) into an envelope error rather than
    /// a transport failure.
    pub async fn dispatch(&self, method: &str, payload: &[u8]) -> Result<Bytes> {
        let handler = self
            .get(method)
            .ok_or_else(|| RpcError::MethodNotFound(method.to_string()))?;

        handler.call(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope;

    #[tokio::test]
    async fn register_and_dispatch() {
        let mut registry = HandlerRegistry::new();
        registry.register("Echo.Say", |msg: String| async move { Ok(msg) });

        assert!(registry.get("Echo.Say").is_some());
        assert_eq!(registry.len(), 1);

        let payload = envelope::encode(&"hello").unwrap();
        let reply = registry.dispatch("Echo.Say", &payload).await.unwrap();
        let decoded: String = envelope::decode(&reply).unwrap();
        assert_eq!(decoded, "hello");
    }

    #[tokio::test]
    async fn unknown_method_is_not_found() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        let result = registry.dispatch("Nope.Missing", &[]).await;
        match result {
            Err(RpcError::MethodNotFound(name)) => assert_eq!(name, "Nope.Missing"),
            other => panic!("expected MethodNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn undecodable_argument_is_handler_error() {
        let mut registry = HandlerRegistry::new();
        registry.register("Adder.Add", |n: u32| async move { Ok(n + 1) });

        // A string payload where a u32 is expected.
        let payload = envelope::encode(&"not a number").unwrap();
        let result = registry.dispatch("Adder.Add", &payload).await;
        assert!(matches!(result, Err(RpcError::Decode(_))));
    }

    #[tokio::test]
    async fn handler_error_propagates() {
        let mut registry = HandlerRegistry::new();
        registry.register("Job.Fail", |_task: String| async move {
            Err::<String, _>(RpcError::Envelope("job rejected".to_string()))
        });

        let payload = envelope::encode(&"x").unwrap();
        let result = registry.dispatch("Job.Fail", &payload).await;
        match result {
            Err(RpcError::Envelope(msg)) => assert_eq!(msg, "job rejected"),
            other => panic!("expected envelope error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn reregistering_replaces_handler() {
        let mut registry = HandlerRegistry::new();
        registry.register("Echo.Say", |_: String| async move { Ok("first".to_string()) });
        registry.register("Echo.Say", |_: String| async move { Ok("second".to_string()) });
        assert_eq!(registry.len(), 1);

        let payload = envelope::encode(&"x").unwrap();
        let reply = registry.dispatch("Echo.Say", &payload).await.unwrap();
        let decoded: String = envelope::decode(&reply).unwrap();
        assert_eq!(decoded, "second");
    }
}
