//! The capability set every cache strategy implements.

use std::sync::Arc;

use keycache_core::types::{CacheKind, CacheStrategy, KeyEntry};

use crate::bounded::LruKeyCache;
use crate::syncmap::SyncMapCache;

/// Backing store of a key cache.
///
/// The lock manager and the strategy switch only ever see this trait, never
/// the concrete structure behind it.
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// Looks up an entry. Never loads from the key store.
    fn get(&self, name: &str) -> Option<Arc<KeyEntry>>;

    /// Inserts or replaces an entry.
    fn put(&self, name: String, entry: Arc<KeyEntry>);

    /// Removes an entry if present.
    fn delete(&self, name: &str);

    /// Removes `name` only if it still maps to this exact `entry`.
    ///
    /// Returns true if the entry was removed.
    fn delete_if_same(&self, name: &str, entry: &Arc<KeyEntry>) -> bool;

    /// Number of entries currently held.
    ///
    /// May enumerate the whole structure; callers must opt in.
    fn len(&self) -> usize;

    /// Returns true if no entries are held.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The strategy this backend was built for.
    fn strategy(&self) -> CacheStrategy;

    /// The capacity-less tag of [`CacheBackend::strategy`].
    fn kind(&self) -> CacheKind {
        self.strategy().kind()
    }
}

/// Builds an empty backend for a strategy.
pub fn new_backend(strategy: CacheStrategy) -> Arc<dyn CacheBackend> {
    match strategy {
        CacheStrategy::Unbounded => Arc::new(SyncMapCache::new()),
        CacheStrategy::Bounded { capacity } => Arc::new(LruKeyCache::new(capacity)),
    }
}
