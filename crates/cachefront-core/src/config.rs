//! Cache store configuration.
//!
//! Unlike most configuration in this workspace, the cache's budgets are
//! compiled in rather than sourced from a file or environment variables: the
//! proxy has exactly one configuration that matters (its byte budgets), and
//! a flags/env layer would only invite divergence between what operators
//! think they configured and what the accept loop actually enforced.

use crate::error::Error;

/// 200 MiB, expressed as `200 * 2^20`.
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 200 * 1024 * 1024;

/// 10 MiB, expressed as `10 * 2^20`.
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 10 * 1024 * 1024;

/// TCP accept backlog for the listening socket.
pub const ACCEPT_BACKLOG: u32 = 100;

/// Size of the buffer used to read a single request from the client.
pub const CLIENT_READ_BUFFER_BYTES: usize = 8192;

/// Size of the scratch buffer used to relay bytes from the origin.
pub const ORIGIN_SCRATCH_BUFFER_BYTES: usize = 8192;

/// Default port the proxy listens on when none is given on the command line.
pub const DEFAULT_PORT: u16 = 8080;

/// Immutable byte budgets for a [`crate::cache::CacheStore`].
///
/// `max_total_bytes` and `max_entry_bytes` are fixed for the lifetime of the
/// store once [`CacheConfig::validated`] has accepted them — see
/// `CacheStore::new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Upper bound on the sum of all live entries' byte sizes.
    pub max_total_bytes: u64,
    /// Upper bound on any single entry's byte size.
    pub max_entry_bytes: u64,
}

impl CacheConfig {
    /// The configuration compiled into the `cachefront-proxy` binary.
    #[must_use]
    pub const fn default() -> Self {
        Self {
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        }
    }

    /// Validates that both budgets are positive and that an entry can ever
    /// fit within the total budget.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if either budget is zero or if
    /// `max_entry_bytes` exceeds `max_total_bytes`.
    pub fn validated(self) -> Result<Self, Error> {
        if self.max_total_bytes == 0 {
            return Err(Error::InvalidConfig(
                "max_total_bytes must be positive".to_string(),
            ));
        }
        if self.max_entry_bytes == 0 {
            return Err(Error::InvalidConfig(
                "max_entry_bytes must be positive".to_string(),
            ));
        }
        if self.max_entry_bytes > self.max_total_bytes {
            return Err(Error::InvalidConfig(
                "max_entry_bytes must not exceed max_total_bytes".to_string(),
            ));
        }
        Ok(self)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::default()
    }
}

/// Parses the optional `[port]` CLI argument per the proxy's command-line
/// contract: a decimal integer in `[1, 65535]`, defaulting to
/// [`DEFAULT_PORT`] when absent or invalid.
#[must_use]
pub fn parse_port(arg: Option<&str>) -> u16 {
    match arg {
        Some(s) => s.parse::<u16>().filter(|&p| p != 0).unwrap_or(DEFAULT_PORT),
        None => DEFAULT_PORT,
    }
}
