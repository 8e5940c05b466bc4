//! # KEYCACHE Admin
//!
//! The `cache-config` administrative path of a key mount.
//!
//! Handlers here are transport-agnostic: the routing layer hands them a raw
//! field map and an [`Operation`], and renders the returned
//! [`CacheConfigResponse`] or [`AdminError`].
//!
//! ## Fields
//!
//! | Field                  | Type   | Used by | Meaning                              |
//! |------------------------|--------|---------|--------------------------------------|
//! | `cache-type`           | string | write   | `"syncmap"` or `"lru"`               |
//! | `cache-size`           | int    | write   | LRU capacity, required for `"lru"`   |
//! | `compute-cache-length` | bool   | read    | Also report `cache-length`           |
//!
//! ## Example
//!
//! ```rust,ignore
//! let state = MountState::new(MountConfig::from_env()?, store);
//! write_cache_config(&state, &CacheConfigWriteRequest::new("lru", Some(500)))?;
//! let resp = read_cache_config(&state, &CacheConfigReadRequest { compute_cache_length: true });
//! assert_eq!(resp.cache_type, "lru");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod dto;
pub mod error;
pub mod path;
pub mod state;

pub use dto::{CacheConfigReadRequest, CacheConfigResponse, CacheConfigWriteRequest};
pub use error::{AdminError, ErrorBody, ErrorResponse};
pub use path::{
    cache_config_path, handle, read_cache_config, write_cache_config, FieldSchema, FieldType,
    Operation, PathSchema,
};
pub use state::{MountConfig, MountState};

/// Cache type re-exported for callers inspecting the mount directly.
pub use keycache_cache::KeyCache;
