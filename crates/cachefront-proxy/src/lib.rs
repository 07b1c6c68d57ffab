//! # cachefront-proxy
//!
//! A forward HTTP/1.x caching proxy built on [`cachefront_core`]'s
//! concurrent LRU response cache.
//!
//! This crate owns everything the cache itself deliberately does not know
//! about: the listening socket and per-connection task dispatch, HTTP/1.x
//! request parsing and re-serialization, key derivation, and the
//! dual-sink (client + capture) relay loop that populates the cache on a
//! miss. See [`pipeline::handle_connection`] for the per-connection state
//! machine.

pub mod error;
pub mod key;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod rewrite;

pub use error::{ProxyError, Result};
pub use pipeline::handle_connection;
