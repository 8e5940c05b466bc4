//! # KEYCACHE Core
//!
//! Core types, errors, and traits for the KEYCACHE key-object cache.
//!
//! - **Types**: Key entries, key material, and cache strategies
//! - **Errors**: A single cloneable error type shared by all crates
//! - **Constants**: Limits, administrative wire names, environment variables
//! - **Traits**: The [`KeyStore`] interface the cache loads from
//!
//! ## Example
//!
//! ```rust
//! use keycache_core::{CacheKind, CacheStrategy};
//!
//! let strategy = CacheStrategy::new(CacheKind::Bounded, Some(500)).unwrap();
//! assert_eq!(strategy.capacity(), Some(500));
//! assert!(CacheStrategy::bounded(0).is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, KeyCacheError};
pub use traits::*;
pub use types::*;
