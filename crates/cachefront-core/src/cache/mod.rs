//! The concurrent LRU response cache.
//!
//! Keyed by a byte-exact request fingerprint (see `cachefront_proxy::key`),
//! bounded both in total bytes and per-entry bytes, and guarded by a single
//! reader/writer lock following the lock-upgrade protocol described on
//! [`CacheStore::lookup`].

mod store;

pub use store::{CacheStats, CacheStore};



#[cfg(all(test, loom))]
mod loom_tests;
