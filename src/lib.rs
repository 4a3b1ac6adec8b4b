//! # workwire
//!
//! Deadline-bounded one-shot RPC over TCP.
//!
//! Every blocking read/write on a connection is raced against a fixed
//! wall-clock deadline; handler execution itself is never time-bounded.
//! Each connection serves exactly one request/response cycle and is then
//! closed; callers open a new connection per call.
//!
//! ## Architecture
//!
//! - [`guard`](guard::guard) - bounds a single I/O step by a deadline
//! - [`envelope`] - header types and length-delimited MsgPack framing
//! - [`ServerCodec`] - per-connection guarded envelope encode/decode
//! - [`Server`] - accept loop, one task and one cycle per connection
//! - [`HandlerRegistry`] - explicit `"Type.Method"` to handler mapping
//! - [`client`] - one-shot calls with the same guarded discipline
//!
//! ## Example
//!
//! ```ignore
//! use workwire::{client, HandlerRegistry, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = HandlerRegistry::new();
//!     registry.register("Worker.DoJob", |task: String| async move {
//!         tokio::time::sleep(std::time::Duration::from_secs(3)).await;
//!         Ok("OK".to_string())
//!     });
//!
//!     let server = Server::bind(ServerConfig::new("127.0.0.1:4200".parse()?), registry).await?;
//!     let addr = server.local_addr()?;
//!     tokio::spawn(server.serve());
//!
//!     let reply: String = client::call(addr, "Worker.DoJob", &"42".to_string()).await?;
//!     assert_eq!(reply, "OK");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod guard;
pub mod handler;
pub mod server;

pub use codec::ServerCodec;
pub use error::{Result, RpcError};
pub use handler::HandlerRegistry;
pub use server::{Server, ServerConfig};
