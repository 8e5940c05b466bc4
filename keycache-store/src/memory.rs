//! In-memory key store.
//!
//! Thread-safe storage suitable for tests, benchmarks, and single-process
//! experiments. Loads can be slowed down or made to fail on demand so the
//! cache's coordination paths can be exercised.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::RngCore;
use tracing::{debug, instrument};

use keycache_core::error::{Result, KeyCacheError};
use keycache_core::traits::KeyStore;
use keycache_core::types::{KeyEntry, KeyMaterial, KeyType};

/// Load counters of a [`MemoryKeyStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Load calls received
    pub loads: u64,
    /// Load calls that returned an error
    pub failed_loads: u64,
    /// Highest number of loads running at the same time
    pub max_concurrent_loads: usize,
}

/// In-memory key store.
///
/// # Fault injection
///
/// - [`MemoryKeyStore::set_load_latency`] delays every load.
/// - [`MemoryKeyStore::fail_next_loads`] makes the next N loads fail with
///   `LoadFailure`.
/// - [`MemoryKeyStore::set_timeout`] turns loads slower than the timeout into
///   `StoreTimeout`.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    /// Primary storage: name → key
    keys: DashMap<String, KeyEntry>,
    /// Artificial delay applied to each load
    load_latency: RwLock<Option<Duration>>,
    /// Loads slower than this fail with a timeout
    timeout: RwLock<Option<Duration>>,
    /// Remaining loads that should fail
    fail_next: AtomicUsize,
    loads: AtomicU64,
    failed_loads: AtomicU64,
    active_loads: AtomicUsize,
    max_concurrent_loads: AtomicUsize,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `count` random keys named `key-0` .. `key-{count-1}`.
    pub fn seeded(count: usize, key_type: KeyType) -> Self {
        let store = Self::new();
        for i in 0..count {
            store.insert(Self::generate(format!("key-{}", i), key_type));
        }
        store
    }

    /// Generates a key with random material of the right size for its type.
    pub fn generate(name: impl Into<String>, key_type: KeyType) -> KeyEntry {
        let mut bytes = vec![0u8; key_type.material_size()];
        rand::thread_rng().fill_bytes(&mut bytes);
        KeyEntry::new(name, key_type, KeyMaterial::from_bytes(&bytes))
    }

    /// Inserts a key without going through the async trait.
    pub fn insert(&self, entry: KeyEntry) {
        self.keys.insert(entry.name.clone(), entry);
    }

    /// Sets or clears the artificial load delay.
    pub fn set_load_latency(&self, latency: Option<Duration>) {
        *self.load_latency.write() = latency;
    }

    /// Sets or clears the load timeout.
    pub fn set_timeout(&self, timeout: Option<Duration>) {
        *self.timeout.write() = timeout;
    }

    /// Makes the next `count` loads fail.
    pub fn fail_next_loads(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the load counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            loads: self.loads.load(Ordering::SeqCst),
            failed_loads: self.failed_loads.load(Ordering::SeqCst),
            max_concurrent_loads: self.max_concurrent_loads.load(Ordering::SeqCst),
        }
    }

    fn take_injected_failure(&self) -> bool {
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn load_inner(&self, name: &str) -> Result<KeyEntry> {
        let latency = *self.load_latency.read();
        let timeout = *self.timeout.read();

        if let Some(latency) = latency {
            match timeout {
                Some(limit) if latency > limit => {
                    tokio::time::sleep(limit).await;
                    return Err(KeyCacheError::StoreTimeout {
                        name: name.to_string(),
                        millis: limit.as_millis() as u64,
                    });
                }
                _ => tokio::time::sleep(latency).await,
            }
        }

        if self.take_injected_failure() {
            return Err(KeyCacheError::LoadFailure {
                name: name.to_string(),
                reason: "injected failure".into(),
            });
        }

        self.keys
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| KeyCacheError::KeyNotFound(name.to_string()))
    }
}

/// Decrements the active-load gauge on every exit path.
struct ActiveLoad<'a>(&'a AtomicUsize);

impl Drop for ActiveLoad<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    #[instrument(skip(self))]
    async fn load(&self, name: &str) -> Result<KeyEntry> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let active = self.active_loads.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_loads.fetch_max(active, Ordering::SeqCst);
        let _active = ActiveLoad(&self.active_loads);

        let result = self.load_inner(name).await;
        if result.is_err() {
            self.failed_loads.fetch_add(1, Ordering::SeqCst);
        }
        debug!(ok = result.is_ok(), "Loaded key from memory store");
        result
    }

    #[instrument(skip(self, entry), fields(key = %entry.name))]
    async fn store(&self, entry: &KeyEntry) -> Result<()> {
        entry.validate()?;
        self.insert(entry.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> Result<()> {
        self.keys.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_load_existing_and_missing() {
        let store = MemoryKeyStore::seeded(3, KeyType::Aes256Gcm96);

        let key = store.load("key-1").await.unwrap();
        assert_eq!(key.name, "key-1");
        assert_eq!(key.latest().unwrap().material.len(), 32);

        let missing = store.load("key-9").await;
        assert!(matches!(missing, Err(KeyCacheError::KeyNotFound(_))));
        assert_eq!(store.stats().loads, 2);
        assert_eq!(store.stats().failed_loads, 1);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = MemoryKeyStore::seeded(1, KeyType::Ed25519);
        store.fail_next_loads(2);

        assert!(matches!(
            store.load("key-0").await,
            Err(KeyCacheError::LoadFailure { .. })
        ));
        assert!(store.load("key-0").await.is_err());
        assert!(store.load("key-0").await.is_ok());
    }

    #[tokio::test]
    async fn test_timeout() {
        let store = MemoryKeyStore::seeded(1, KeyType::Ed25519);
        store.set_load_latency(Some(Duration::from_millis(50)));
        store.set_timeout(Some(Duration::from_millis(5)));

        let result = store.load("key-0").await;
        assert!(matches!(result, Err(KeyCacheError::StoreTimeout { millis: 5, .. })));
    }

    #[test]
    fn test_store_and_delete() {
        let store = MemoryKeyStore::new();
        let key = MemoryKeyStore::generate("billing", KeyType::Rsa2048);

        tokio_test::block_on(async {
            store.store(&key).await.unwrap();
            assert_eq!(store.load("billing").await.unwrap(), key);

            store.delete("billing").await.unwrap();
            store.delete("billing").await.unwrap();
        });
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_rejects_invalid_entry() {
        let store = MemoryKeyStore::new();
        let mut key = MemoryKeyStore::generate("billing", KeyType::Ed25519);
        key.latest_version = 3;

        let result = tokio_test::block_on(store.store(&key));
        assert!(matches!(result, Err(KeyCacheError::InvalidKey(_))));
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_tracks_concurrent_loads() {
        let store = Arc::new(MemoryKeyStore::seeded(4, KeyType::Aes256Gcm96));
        store.set_load_latency(Some(Duration::from_millis(30)));

        let loads = (0..4).map(|i| {
            let store = Arc::clone(&store);
            async move { store.load(&format!("key-{}", i)).await }
        });
        for result in futures::future::join_all(loads).await {
            result.unwrap();
        }

        let stats = store.stats();
        assert_eq!(stats.loads, 4);
        assert!(stats.max_concurrent_loads >= 2);
    }
}
