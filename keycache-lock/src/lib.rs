//! # KEYCACHE Lock
//!
//! Per-key load coordination in front of the key cache.
//!
//! [`LockManager`] answers lookups from the cache and, on a miss, makes sure
//! only one caller per key name fetches from the key store while everyone
//! else waits for that result.
//!
//! ## Example
//!
//! ```rust,ignore
//! use keycache_lock::LockManager;
//! use keycache_store::MemoryKeyStore;
//!
//! let lm = LockManager::new(MemoryKeyStore::seeded(10, KeyType::Aes256Gcm96));
//! let key = lm.get_key("key-3").await?;      // loads
//! let again = lm.get_key("key-3").await?;    // cache hit
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod flight;
mod manager;

pub use manager::{LockManager, LockStats};
