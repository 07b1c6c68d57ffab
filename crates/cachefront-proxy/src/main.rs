//! `cachefront-proxy` — forward HTTP/1.x caching proxy binary.
//!
//! `program [port]`: `port` is a decimal integer in `[1, 65535]`; absent
//! or invalid falls back to [`cachefront_core::config::DEFAULT_PORT`].

use std::sync::Arc;

use anyhow::Context;
use cachefront_core::config::{
    parse_port, ACCEPT_BACKLOG, DEFAULT_MAX_ENTRY_BYTES, DEFAULT_MAX_TOTAL_BYTES,
};
use cachefront_core::CacheStore;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// cachefront — a forward HTTP/1.x caching proxy.
#[derive(Parser, Debug)]
#[command(name = "cachefront-proxy")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on. Defaults to 8080 when absent or out of range.
    port: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let port = parse_port(args.port.as_deref());

    let cache = Arc::new(
        CacheStore::init(DEFAULT_MAX_TOTAL_BYTES, DEFAULT_MAX_ENTRY_BYTES)
            .context("cache store initialization failed")?,
    );

    let addr = format!("0.0.0.0:{port}");
    let listener = bind(&addr).await?;
    tracing::info!(%addr, backlog = ACCEPT_BACKLOG, "cachefront-proxy listening");

    let mut workers = JoinSet::new();
    run_accept_loop(listener, Arc::clone(&cache), &mut workers).await;

    tracing::info!(in_flight = workers.len(), "shutting down, draining workers");
    while workers.join_next().await.is_some() {}

    // Every spawned task has now completed and dropped its clone of `cache`,
    // so this is the last handle and the unwrap cannot fail.
    match Arc::try_unwrap(cache) {
        Ok(store) => store.destroy(),
        Err(still_shared) => {
            tracing::warn!("cache still referenced after worker drain, skipping destroy");
            drop(still_shared);
        }
    }

    Ok(())
}

/// Binds the listening socket. `ACCEPT_BACKLOG` is informational here:
/// `tokio::net::TcpListener::bind` does not expose the raw backlog knob
/// directly, so the constant documents the intended queue depth for
/// anyone tuning the underlying socket rather than being passed through a
/// library call.
async fn bind(addr: &str) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))
}

/// Accepts connections until `SIGINT`, spawning one task per connection
/// into `workers` so the caller can drain them before tearing down the
/// cache.
///
/// Rust's standard library already arranges for a broken pipe to surface
/// as a normal `io::Error` on the writing call rather than terminating the
/// process with `SIGPIPE` (unlike the C original this system descends
/// from), so no explicit signal masking is needed here — the forwarding
/// pipeline's ordinary error handling already covers it.
async fn run_accept_loop(
    listener: TcpListener,
    cache: Arc<CacheStore>,
    workers: &mut JoinSet<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "connection accepted");
                        let cache = Arc::clone(&cache);
                        workers.spawn(async move {
                            cachefront_proxy::handle_connection(stream, cache).await;
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received, stopping accept loop");
                break;
            }
        }
    }
}
