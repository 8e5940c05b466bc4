//! Cache strategy types.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{Result, KeyCacheError};

/// Capacity-less tag for a cache strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKind {
    /// Concurrent map that never evicts.
    Unbounded,
    /// Least-recently-used cache with a fixed capacity.
    Bounded,
}

impl std::fmt::Display for CacheKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKind::Unbounded => f.write_str("unbounded"),
            CacheKind::Bounded => f.write_str("bounded"),
        }
    }
}

/// The active eviction/storage policy of a key cache.
///
/// `Bounded` carries a `NonZeroUsize`, so a zero-capacity bounded strategy
/// cannot be represented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CacheStrategy {
    /// Unbounded concurrent map.
    #[default]
    #[serde(rename = "syncmap")]
    Unbounded,
    /// Bounded LRU cache.
    #[serde(rename = "lru")]
    Bounded {
        /// Maximum number of resident entries
        capacity: NonZeroUsize,
    },
}

impl CacheStrategy {
    /// Builds a strategy from a kind and an optional size.
    ///
    /// The size is ignored for `Unbounded`.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for `Bounded` without a positive size.
    pub fn new(kind: CacheKind, size: Option<usize>) -> Result<Self> {
        match kind {
            CacheKind::Unbounded => Ok(CacheStrategy::Unbounded),
            CacheKind::Bounded => size
                .and_then(NonZeroUsize::new)
                .map(|capacity| CacheStrategy::Bounded { capacity })
                .ok_or_else(|| {
                    KeyCacheError::InvalidConfiguration(
                        "bounded cache requires a capacity greater than zero".into(),
                    )
                }),
        }
    }

    /// Shorthand for a bounded strategy.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `capacity` is zero.
    pub fn bounded(capacity: usize) -> Result<Self> {
        Self::new(CacheKind::Bounded, Some(capacity))
    }

    /// Returns the capacity-less tag.
    pub fn kind(&self) -> CacheKind {
        match self {
            CacheStrategy::Unbounded => CacheKind::Unbounded,
            CacheStrategy::Bounded { .. } => CacheKind::Bounded,
        }
    }

    /// Returns the capacity, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            CacheStrategy::Unbounded => None,
            CacheStrategy::Bounded { capacity } => Some(capacity.get()),
        }
    }
}

impl std::fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheStrategy::Unbounded => f.write_str("syncmap"),
            CacheStrategy::Bounded { capacity } => write!(f, "lru({})", capacity),
        }
    }
}
