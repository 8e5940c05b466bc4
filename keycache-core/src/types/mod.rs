//! Domain types for KEYCACHE.
//!
//! - [`KeyEntry`]: Decoded key object held by the cache
//! - [`KeyMaterial`]: Zeroized secret bytes of one key version
//! - [`CacheStrategy`]: Active eviction/storage policy

mod key;
mod strategy;

pub use key::*;
pub use strategy::*;
