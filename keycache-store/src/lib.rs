//! # KEYCACHE Store
//!
//! In-memory [`KeyStore`](keycache_core::KeyStore) implementation used by
//! tests and the benchmark CLI. Durable storage belongs to the surrounding
//! secret engine and is not provided here.
//!
//! ## Example
//!
//! ```rust,ignore
//! use keycache_store::MemoryKeyStore;
//! use keycache_core::{KeyStore, KeyType};
//!
//! let store = MemoryKeyStore::seeded(100, KeyType::Aes256Gcm96);
//! let key = store.load("key-42").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod memory;

pub use memory::{MemoryKeyStore, StoreStats};
