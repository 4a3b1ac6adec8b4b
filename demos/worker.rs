//! Worker demo - a slow job server under heavy one-shot load.
//!
//! Starts an RPC server whose `Worker.DoJob` handler sleeps three seconds
//! before replying "OK", then fires 1000 concurrent one-shot calls at it
//! and waits for every reply. With the default 60-second per-step
//! deadline, all 1000 calls complete in roughly the single-job time.
//!
//! ```sh
//! RUST_LOG=info cargo run --example worker
//! ```

use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;
use workwire::{client, HandlerRegistry, Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut registry = HandlerRegistry::new();
    registry.register("Worker.DoJob", |task: String| async move {
        tracing::info!("worker: do job {}", task);
        tokio::time::sleep(Duration::from_secs(3)).await;
        Ok("OK".to_string())
    });

    // Bind failure propagates out of main and exits non-zero.
    let server = Server::bind(ServerConfig::new("127.0.0.1:4200".parse()?), registry).await?;
    let addr = server.local_addr()?;
    tokio::spawn(server.serve());

    const N: usize = 1000;
    let start = Instant::now();

    let mut calls = Vec::with_capacity(N);
    for i in 0..N {
        calls.push(tokio::spawn(async move {
            client::call::<_, _, String>(addr, "Worker.DoJob", &i.to_string()).await
        }));
    }

    let mut ok = 0usize;
    for call in calls {
        match call.await? {
            Ok(reply) => {
                debug_assert_eq!(reply, "OK");
                ok += 1;
            }
            Err(e) => tracing::error!("call failed: {}", e),
        }
    }

    tracing::info!(
        "completed {}/{} calls in {:.2?}",
        ok,
        N,
        start.elapsed()
    );
    Ok(())
}
