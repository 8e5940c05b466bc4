//! Bounded least-recently-used strategy.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

use keycache_core::types::{CacheStrategy, KeyEntry};

use crate::backend::CacheBackend;

/// Bounded key cache with least-recently-used eviction.
///
/// Every lookup moves the entry to the front of the recency list, so reads
/// mutate and a `Mutex` (not an `RwLock`) guards the list. Critical sections
/// are O(1) and never span I/O.
pub struct LruKeyCache {
    entries: Mutex<LruCache<String, Arc<KeyEntry>>>,
    capacity: NonZeroUsize,
}

impl LruKeyCache {
    /// Creates an empty cache holding at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Checks residency without touching recency.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().contains(name)
    }
}

impl std::fmt::Debug for LruKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruKeyCache")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.lock().len())
            .finish()
    }
}

impl CacheBackend for LruKeyCache {
    fn get(&self, name: &str) -> Option<Arc<KeyEntry>> {
        self.entries.lock().get(name).cloned()
    }

    /// Replacing a resident name refreshes it and never evicts.
    fn put(&self, name: String, entry: Arc<KeyEntry>) {
        let evicted = self.entries.lock().push(name, entry);
        if let Some((evicted_name, _)) = evicted {
            trace!(key = %evicted_name, "Evicted or replaced LRU entry");
        }
    }

    fn delete(&self, name: &str) {
        self.entries.lock().pop(name);
    }

    fn delete_if_same(&self, name: &str, entry: &Arc<KeyEntry>) -> bool {
        let mut entries = self.entries.lock();
        let same = entries
            .peek(name)
            .is_some_and(|current| Arc::ptr_eq(current, entry));
        if same {
            entries.pop(name);
        }
        same
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::Bounded {
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keycache_core::types::{KeyMaterial, KeyType};
    use proptest::prelude::*;

    fn make_key(name: &str) -> Arc<KeyEntry> {
        Arc::new(KeyEntry::new(
            name,
            KeyType::ChaCha20Poly1305,
            KeyMaterial::from_bytes(&[2u8; 32]),
        ))
    }

    fn cache_of(capacity: usize) -> LruKeyCache {
        LruKeyCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = cache_of(3);
        cache.put("A".into(), make_key("A"));
        cache.put("B".into(), make_key("B"));
        cache.put("C".into(), make_key("C"));

        // Touch A so B becomes the oldest
        assert!(cache.get("A").is_some());

        cache.put("D".into(), make_key("D"));

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("B"));
        assert!(cache.contains("A"));
        assert!(cache.contains("C"));
        assert!(cache.contains("D"));
    }

    #[test]
    fn test_untouched_entries_evict_in_insertion_order() {
        let cache = cache_of(2);
        cache.put("A".into(), make_key("A"));
        cache.put("B".into(), make_key("B"));
        cache.put("C".into(), make_key("C"));

        assert!(!cache.contains("A"));
        assert!(cache.contains("B"));
    }

    #[test]
    fn test_replace_counts_as_use_and_does_not_evict() {
        let cache = cache_of(2);
        cache.put("A".into(), make_key("A"));
        cache.put("B".into(), make_key("B"));
        cache.put("A".into(), make_key("A"));
        assert_eq!(cache.len(), 2);

        cache.put("C".into(), make_key("C"));
        assert!(cache.contains("A"));
        assert!(!cache.contains("B"));
    }

    #[test]
    fn test_delete_if_same_ignores_replaced_entry() {
        let cache = cache_of(2);
        let old = make_key("A");
        cache.put("A".into(), Arc::clone(&old));
        cache.put("A".into(), make_key("A"));

        assert!(!cache.delete_if_same("A", &old));
        assert!(cache.contains("A"));
        assert!(!cache.delete_if_same("missing", &old));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let cache = cache_of(2);
        cache.delete("missing");
        cache.put("A".into(), make_key("A"));
        cache.delete("A");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access_respects_capacity() {
        let cache = Arc::new(cache_of(8));

        std::thread::scope(|s| {
            for t in 0..8 {
                let cache = Arc::clone(&cache);
                s.spawn(move || {
                    for i in 0..500 {
                        let name = format!("key-{}", (t * 7 + i) % 32);
                        match i % 3 {
                            0 => cache.put(name.clone(), make_key(&name)),
                            1 => {
                                cache.get(&name);
                            }
                            _ => cache.delete(&name),
                        }
                        assert!(cache.len() <= 8);
                    }
                });
            }
        });

        assert!(cache.len() <= 8);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Put(u8),
        Get(u8),
        Delete(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..12).prop_map(Op::Put),
            (0u8..12).prop_map(Op::Get),
            (0u8..12).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_lru_model(capacity in 1usize..6, ops in prop::collection::vec(op_strategy(), 0..200)) {
            let cache = cache_of(capacity);
            // Front is least recently used
            let mut model: Vec<u8> = Vec::new();

            for op in ops {
                match op {
                    Op::Put(k) => {
                        cache.put(k.to_string(), make_key(&k.to_string()));
                        if let Some(pos) = model.iter().position(|m| *m == k) {
                            model.remove(pos);
                        } else if model.len() == capacity {
                            model.remove(0);
                        }
                        model.push(k);
                    }
                    Op::Get(k) => {
                        let hit = cache.get(&k.to_string()).is_some();
                        let pos = model.iter().position(|m| *m == k);
                        prop_assert_eq!(hit, pos.is_some());
                        if let Some(pos) = pos {
                            model.remove(pos);
                            model.push(k);
                        }
                    }
                    Op::Delete(k) => {
                        cache.delete(&k.to_string());
                        model.retain(|m| *m != k);
                    }
                }

                prop_assert!(cache.len() <= capacity);
                prop_assert_eq!(cache.len(), model.len());
                for k in 0u8..12 {
                    prop_assert_eq!(cache.contains(&k.to_string()), model.contains(&k));
                }
            }
        }
    }
}
