//! The per-connection forwarding state machine.
//!
//! ```text
//! RECV_REQUEST → PARSE → BUILD_KEY → CACHE_LOOKUP
//!   ├─ HIT  → WRITE_CLIENT(cached_bytes) → DONE
//!   └─ MISS → RESOLVE → DIAL_ORIGIN → REWRITE_HEADERS → SEND_ORIGIN
//!              → RELAY_LOOP → CACHE_INSERT? → DONE
//! ERROR at any step → WRITE_CLIENT(error_response) → DONE
//! ```
//!
//! One task runs this state machine per accepted connection; the cache
//! lock is never held across an `.await` point anywhere in this module.

use std::sync::Arc;

use cachefront_core::config::{CLIENT_READ_BUFFER_BYTES, ORIGIN_SCRATCH_BUFFER_BYTES};
use cachefront_core::CacheStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{ProxyError, Result};
use crate::key::build_key;
use crate::request::parse_request;
use crate::response::error_envelope;
use crate::rewrite::rewrite_for_origin;

/// Drives one client connection end to end. Errors are handled internally
/// (an HTTP error envelope before any bytes are sent, silent abandonment
/// after); this function never returns an error the caller need act on.
pub async fn handle_connection(mut client: TcpStream, cache: Arc<CacheStore>) {
    if let Err(err) = serve(&mut client, &cache).await {
        tracing::debug!(error = %err, code = err.code(), "worker terminated with error");
    }
}

async fn serve(client: &mut TcpStream, cache: &CacheStore) -> Result<()> {
    let raw = match read_request(client).await {
        Ok(raw) => raw,
        Err(err) => return fail_before_response(client, err).await,
    };

    let parsed = match parse_request(&raw) {
        Ok(p) => p,
        Err(err) => return fail_before_response(client, err).await,
    };

    let key = match build_key(&parsed) {
        Ok(k) => k,
        Err(err) => return fail_before_response(client, err).await,
    };
    tracing::info!(fingerprint = %key, "request received");

    if let Some(cached) = cache.lookup(&key) {
        tracing::info!(fingerprint = %key, "cache hit");
        // A client write failure past this point is abandoned silently:
        // the client has already "received" the response as far as the
        // worker's contract is concerned.
        let _ = client.write_all(&cached).await;
        return Ok(());
    }
    tracing::info!(fingerprint = %key, "cache miss");

    let rewritten = match rewrite_for_origin(&parsed) {
        Ok(bytes) => bytes,
        Err(err) => return fail_before_response(client, err).await,
    };

    let (_, host, port, _) = parsed.destination()?;
    let mut origin = match TcpStream::connect((host.as_str(), port)).await {
        Ok(stream) => stream,
        Err(e) => {
            let err = ProxyError::Origin(format!("dial {host}:{port} failed: {e}"));
            return fail_before_response(client, err).await;
        }
    };

    if let Err(e) = origin.write_all(&rewritten).await {
        let err = ProxyError::Origin(format!("send to origin failed: {e}"));
        return fail_before_response(client, err).await;
    }

    relay(client, &mut origin, cache, &key).await
}

/// Writes the HTTP error envelope for `err` — the client has received no
/// response bytes at this point in every caller — then propagates `err`
/// so the caller can log it.
async fn fail_before_response(client: &mut TcpStream, err: ProxyError) -> Result<()> {
    let _ = client.write_all(&error_envelope(&err)).await;
    Err(err)
}

/// Reads from the client until the request's header-terminating blank
/// line appears, using [`CLIENT_READ_BUFFER_BYTES`]-sized reads.
///
/// A connection closed before any bytes arrive, or before the headers are
/// complete, is a [`ProxyError::ClientRequest`] — malformed/truncated
/// input, not an origin error. Failing to grow the accumulation buffer is
/// a [`ProxyError::Resource`] instead.
async fn read_request(client: &mut TcpStream) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(CLIENT_READ_BUFFER_BYTES);
    let mut chunk = vec![0u8; CLIENT_READ_BUFFER_BYTES];

    loop {
        let n = client
            .read(&mut chunk)
            .await
            .map_err(|e| ProxyError::ClientRequest(format!("recv failed: {e}")))?;
        if n == 0 {
            return Err(ProxyError::ClientRequest(
                "connection closed before request headers were complete".to_string(),
            ));
        }
        if buf.try_reserve(n).is_err() {
            return Err(ProxyError::Resource(
                "failed to grow client request buffer".to_string(),
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
        if header_terminator(&buf).is_some() {
            return Ok(buf);
        }
        // A request whose headers alone exceed several read buffers is
        // treated as malformed rather than read indefinitely.
        if buf.len() > CLIENT_READ_BUFFER_BYTES * 8 {
            return Err(ProxyError::ClientRequest(
                "request headers exceeded maximum size".to_string(),
            ));
        }
    }
}

fn header_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// The relay loop: read a chunk from `origin`, write it to `client`, and —
/// while capture is still live — append it to a growable buffer for
/// post-stream `insert`.
async fn relay(
    client: &mut TcpStream,
    origin: &mut TcpStream,
    cache: &CacheStore,
    key: &str,
) -> Result<()> {
    let mut scratch = Vec::new();
    if scratch.try_reserve_exact(ORIGIN_SCRATCH_BUFFER_BYTES).is_err() {
        let err = ProxyError::Resource("failed to allocate origin relay buffer".to_string());
        return fail_before_response(client, err).await;
    }
    scratch.resize(ORIGIN_SCRATCH_BUFFER_BYTES, 0);
    let mut capture: Option<Vec<u8>> = Some(Vec::new());
    let mut bytes_sent = false;

    loop {
        let n = match origin.read(&mut scratch).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                // A read error mid-stream suppresses insertion; the bytes
                // already relayed stand, nothing more is sent or cached.
                tracing::debug!(fingerprint = %key, error = %e, "origin read failed mid-relay");
                let err = ProxyError::Origin(format!("origin read failed: {e}"));
                if !bytes_sent {
                    // Nothing has reached the client yet: this is still a
                    // failed-before-response case, same as a dial failure.
                    let _ = client.write_all(&error_envelope(&err)).await;
                }
                return Err(err);
            }
        };
        let chunk = &scratch[..n];

        if client.write_all(chunk).await.is_err() {
            // Client write failure aborts the relay: origin bytes already
            // read, and anything captured so far, are discarded outright.
            // No partial cache insert; this is not reported as an error.
            tracing::debug!(fingerprint = %key, "client write failed mid-relay");
            return Ok(());
        }
        bytes_sent = true;

        if let Some(buf) = capture.as_mut() {
            if append_growing(buf, chunk).is_err() {
                tracing::debug!(fingerprint = %key, "capture buffer allocation failed, capture abandoned");
                capture = None;
            }
        }
    }

    if let Some(buf) = capture {
        if !buf.is_empty() {
            let size = buf.len();
            cache.insert(key.to_string(), buf);
            tracing::info!(fingerprint = %key, size, "cache insert");
        }
    }

    Ok(())
}

/// Appends `chunk` to `buf`, growing capacity by doubling (to at least
/// `buf.len() + chunk.len()`) rather than the amortized default, and
/// surfacing an allocation failure as `Err(())` instead of aborting,
/// scoped to response capture alone.
fn append_growing(buf: &mut Vec<u8>, chunk: &[u8]) -> std::result::Result<(), ()> {
    let needed = buf.len() + chunk.len();
    if buf.capacity() < needed {
        let mut target = buf.capacity().max(1);
        while target < needed {
            target *= 2;
        }
        let additional = target - buf.capacity();
        if buf.try_reserve_exact(additional).is_err() {
            return Err(());
        }
    }
    buf.extend_from_slice(chunk);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_terminator_finds_blank_line() {
        let buf = b"GET / HTTP/1.0\r\nHost: a\r\n\r\n";
        assert_eq!(header_terminator(buf), Some(buf.len() - 4));
    }

    #[test]
    fn header_terminator_absent_without_blank_line() {
        assert_eq!(header_terminator(b"GET / HTTP/1.0\r\nHost: a\r\n"), None);
    }

    #[test]
    fn append_growing_accumulates_bytes_in_order() {
        let mut buf = Vec::new();
        append_growing(&mut buf, b"ab").unwrap();
        append_growing(&mut buf, b"cd").unwrap();
        assert_eq!(buf, b"abcd");
    }

    #[test]
    fn append_growing_capacity_at_least_doubles_to_fit() {
        let mut buf = Vec::with_capacity(1);
        append_growing(&mut buf, b"0123456789").unwrap();
        assert!(buf.capacity() >= 10);
    }
}
