//! Error types for the forwarding pipeline.
//!
//! Error codes follow the pattern `PROXY-XXX`, mirroring
//! `cachefront_core::error::Error`'s `CACHE-XXX` convention.

use thiserror::Error;

/// Result type alias for worker-level operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// The error kinds the forwarding pipeline distinguishes, named abstractly
/// by failure domain rather than after any one underlying syscall.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Reading the request from the client failed, the read was truncated,
    /// the request line or headers were malformed, or no `Host` could be
    /// derived (PROXY-001).
    #[error("[PROXY-001] malformed client request: {0}")]
    ClientRequest(String),

    /// DNS resolution, TCP connect, send, or mid-stream read against the
    /// origin failed (PROXY-002).
    #[error("[PROXY-002] origin error: {0}")]
    Origin(String),

    /// An allocation failed somewhere in the worker or the cache
    /// (PROXY-003). Rust surfaces this as an error variant rather than a
    /// process abort so the worker can still answer the client.
    #[error("[PROXY-003] resource exhausted: {0}")]
    Resource(String),
}

impl ProxyError {
    /// Returns the error code (e.g., "PROXY-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ClientRequest(_) => "PROXY-001",
            Self::Origin(_) => "PROXY-002",
            Self::Resource(_) => "PROXY-003",
        }
    }

    /// The HTTP status/reason this error kind maps to when the client has
    /// not yet received any response bytes.
    #[must_use]
    pub const fn status(&self) -> (u16, &'static str) {
        match self {
            Self::ClientRequest(_) => (400, "Bad Request"),
            Self::Origin(_) => (502, "Bad Gateway"),
            Self::Resource(_) => (500, "Internal Server Error"),
        }
    }
}
