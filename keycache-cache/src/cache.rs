//! Key cache with a runtime-switchable strategy.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use keycache_core::error::Result;
use keycache_core::types::{CacheKind, CacheStrategy, KeyEntry};

use crate::backend::{new_backend, CacheBackend};

/// Key cache whose backing strategy can be replaced while in use.
///
/// # Consistency
///
/// Every operation clones the active backend handle under a short read lock
/// and then runs entirely against that one backend. An operation racing with
/// [`KeyCache::switch_to`] therefore sees either the old or the new strategy,
/// never a mix. The replaced backend is freed once its last in-flight
/// operation finishes.
pub struct KeyCache {
    active: RwLock<Arc<dyn CacheBackend>>,
}

impl KeyCache {
    /// Creates a cache with the default (unbounded) strategy.
    pub fn new() -> Self {
        Self::with_strategy(CacheStrategy::default())
    }

    /// Creates a cache with the given strategy.
    pub fn with_strategy(strategy: CacheStrategy) -> Self {
        Self {
            active: RwLock::new(new_backend(strategy)),
        }
    }

    fn backend(&self) -> Arc<dyn CacheBackend> {
        self.active.read().clone()
    }

    /// Non-blocking lookup against the active strategy.
    pub fn get(&self, name: &str) -> Option<Arc<KeyEntry>> {
        self.backend().get(name)
    }

    /// Inserts or replaces an entry in the active strategy.
    pub fn put(&self, name: impl Into<String>, entry: Arc<KeyEntry>) {
        self.backend().put(name.into(), entry);
    }

    /// Removes an entry from the active strategy if present.
    pub fn delete(&self, name: &str) {
        self.backend().delete(name);
    }

    /// Removes `name` from the active strategy only if it still maps to `entry`.
    pub fn delete_if_same(&self, name: &str, entry: &Arc<KeyEntry>) -> bool {
        self.backend().delete_if_same(name, entry)
    }

    /// Number of resident entries.
    ///
    /// Can be slow for very large unbounded caches.
    pub fn len(&self) -> usize {
        self.backend().len()
    }

    /// Returns true if no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.backend().is_empty()
    }

    /// The active strategy. O(1), never touches entries.
    pub fn current_strategy(&self) -> CacheStrategy {
        self.active.read().strategy()
    }

    /// The active strategy kind.
    pub fn current_kind(&self) -> CacheKind {
        self.current_strategy().kind()
    }

    /// Capacity of the active strategy, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        self.current_strategy().capacity()
    }

    /// Validates and installs a new strategy.
    ///
    /// The new backend starts empty. Switching to the configuration that is
    /// already active still clears the cache.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for `Bounded` without a positive
    /// capacity; the active strategy and its entries are left untouched.
    pub fn switch_to(&self, kind: CacheKind, capacity: Option<usize>) -> Result<CacheStrategy> {
        let strategy = CacheStrategy::new(kind, capacity)?;
        self.switch_strategy(strategy);
        Ok(strategy)
    }

    /// Installs an already-validated strategy, discarding all entries.
    pub fn switch_strategy(&self, strategy: CacheStrategy) {
        let fresh = new_backend(strategy);
        let previous = std::mem::replace(&mut *self.active.write(), fresh);
        let previous_strategy = previous.strategy();

        if previous_strategy == strategy {
            debug!(strategy = %strategy, "Re-applied cache strategy, entries cleared");
        }

        match previous_strategy {
            CacheStrategy::Bounded { .. } => info!(
                from = %previous_strategy,
                to = %strategy,
                discarded = previous.len(),
                "Switched key cache strategy"
            ),
            CacheStrategy::Unbounded => info!(
                from = %previous_strategy,
                to = %strategy,
                "Switched key cache strategy"
            ),
        }
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("strategy", &self.current_strategy())
            .finish()
    }
}
