//! # cachefront-core
//!
//! The concurrent, byte-bounded LRU response cache at the heart of the
//! cachefront forward proxy.
//!
//! `cachefront-core` is deliberately free of networking and async code: it
//! is a synchronously callable library so its invariants can be exercised
//! directly by property tests and, under the `loom` feature, by exhaustive
//! interleaving checks.
//!
//! ## Quick Start
//!
//! ```rust
//! use cachefront_core::CacheStore;
//!
//! let store = CacheStore::init(200 * 1024 * 1024, 10 * 1024 * 1024).unwrap();
//!
//! store.insert("http://example.com:80/".to_string(), b"hello".to_vec());
//! assert_eq!(store.lookup("http://example.com:80/").as_deref(), Some(&b"hello"[..]));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod error;
pub mod sync;

pub use cache::{CacheStats, CacheStore};
pub use config::CacheConfig;
pub use error::{Error, Result};
