//! Error types for the cachefront response cache.

use thiserror::Error;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or operating the cache store.
///
/// Error codes follow the pattern `CACHE-XXX` for easy debugging.
#[derive(Error, Debug)]
pub enum Error {
    /// `init` was called on a store that has already been initialized (CACHE-001).
    #[error("[CACHE-001] cache store already initialized")]
    AlreadyInitialized,

    /// `init` was called with a non-positive byte budget (CACHE-002).
    #[error("[CACHE-002] invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns the error code (e.g., "CACHE-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AlreadyInitialized => "CACHE-001",
            Self::InvalidConfig(_) => "CACHE-002",
        }
    }
}
