//! # KEYCACHE Cache
//!
//! In-memory cache of decoded key objects with two interchangeable
//! strategies:
//!
//! - **Unbounded** ([`SyncMapCache`]): sharded concurrent map, never evicts
//! - **Bounded** ([`LruKeyCache`]): least-recently-used eviction at a fixed capacity
//!
//! [`KeyCache`] owns the active strategy and can switch it at runtime. A
//! switch always starts from an empty cache.
//!
//! ## Example
//!
//! ```rust
//! use keycache_cache::KeyCache;
//! use keycache_core::CacheKind;
//!
//! let cache = KeyCache::new();
//! assert_eq!(cache.current_kind(), CacheKind::Unbounded);
//!
//! cache.switch_to(CacheKind::Bounded, Some(500)).unwrap();
//! assert_eq!(cache.capacity(), Some(500));
//!
//! // Bounded caches need a positive size; the switch is rejected as a whole
//! assert!(cache.switch_to(CacheKind::Bounded, Some(0)).is_err());
//! assert_eq!(cache.capacity(), Some(500));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod backend;
mod bounded;
mod cache;
mod syncmap;

pub use backend::{new_backend, CacheBackend};
pub use bounded::LruKeyCache;
pub use cache::KeyCache;
pub use syncmap::SyncMapCache;
