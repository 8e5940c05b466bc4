//! Unbounded concurrent-map strategy.

use std::sync::Arc;

use dashmap::DashMap;

use keycache_core::types::{CacheStrategy, KeyEntry};

use crate::backend::CacheBackend;

/// Unbounded key cache backed by a sharded concurrent map.
///
/// Keys hash to independent shards, so lookups and inserts for unrelated
/// names do not contend. Nothing is ever evicted.
#[derive(Debug, Default)]
pub struct SyncMapCache {
    entries: DashMap<String, Arc<KeyEntry>>,
}

impl SyncMapCache {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl CacheBackend for SyncMapCache {
    fn get(&self, name: &str) -> Option<Arc<KeyEntry>> {
        self.entries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn put(&self, name: String, entry: Arc<KeyEntry>) {
        self.entries.insert(name, entry);
    }

    fn delete(&self, name: &str) {
        self.entries.remove(name);
    }

    fn delete_if_same(&self, name: &str, entry: &Arc<KeyEntry>) -> bool {
        self.entries
            .remove_if(name, |_, current| Arc::ptr_eq(current, entry))
            .is_some()
    }

    /// Locks every shard in turn to sum their sizes.
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::Unbounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keycache_core::types::{KeyMaterial, KeyType};

    fn make_key(name: &str) -> Arc<KeyEntry> {
        Arc::new(KeyEntry::new(
            name,
            KeyType::Aes256Gcm96,
            KeyMaterial::from_bytes(&[1u8; 32]),
        ))
    }

    #[test]
    fn test_put_get_delete() {
        let cache = SyncMapCache::new();
        cache.put("payments".into(), make_key("payments"));

        assert_eq!(cache.get("payments").unwrap().name, "payments");
        assert!(cache.get("billing").is_none());

        cache.delete("payments");
        assert!(cache.get("payments").is_none());

        // Deleting a missing key is a no-op
        cache.delete("payments");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_delete_if_same_keeps_newer_entry() {
        let cache = SyncMapCache::new();
        let old = make_key("payments");
        let newer = make_key("payments");
        cache.put("payments".into(), Arc::clone(&newer));

        assert!(!cache.delete_if_same("payments", &old));
        assert!(Arc::ptr_eq(&cache.get("payments").unwrap(), &newer));

        assert!(cache.delete_if_same("payments", &newer));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_does_not_double_count() {
        let cache = SyncMapCache::new();
        cache.put("payments".into(), make_key("payments"));
        cache.put("payments".into(), make_key("payments"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_never_evicts() {
        let cache = SyncMapCache::new();
        for i in 0..1000 {
            let name = format!("key-{}", i);
            cache.put(name.clone(), make_key(&name));
        }
        assert_eq!(cache.len(), 1000);
        assert!(cache.get("key-0").is_some());
    }

    #[test]
    fn test_concurrent_distinct_inserts() {
        let cache = Arc::new(SyncMapCache::new());

        std::thread::scope(|s| {
            for t in 0..8 {
                let cache = Arc::clone(&cache);
                s.spawn(move || {
                    for i in 0..250 {
                        let name = format!("key-{}-{}", t, i);
                        cache.put(name.clone(), make_key(&name));
                        assert!(cache.get(&name).is_some());
                    }
                });
            }
        });

        assert_eq!(cache.len(), 2000);
    }
}
