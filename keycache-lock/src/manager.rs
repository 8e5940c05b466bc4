//! Lock manager: cached key lookups with per-key load exclusivity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument, warn};

use keycache_cache::KeyCache;
use keycache_core::error::{Result, KeyCacheError};
use keycache_core::traits::KeyStore;
use keycache_core::types::{CacheStrategy, KeyEntry};

use crate::flight::{InFlight, Registration};

/// Lookup counters of a [`LockManager`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing cached
    pub misses: u64,
    /// Loads issued to the key store
    pub loads: u64,
    /// Loads that failed
    pub load_failures: u64,
    /// Callers that waited on another caller's load instead of loading
    pub coalesced: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    coalesced: AtomicU64,
}

enum Role<'a> {
    Loader(Registration<'a>),
    Waiter(tokio::sync::watch::Receiver<crate::flight::LoadOutcome>),
}

/// Serves decoded keys from a [`KeyCache`], loading misses from a
/// [`KeyStore`] at most once per name at a time.
///
/// # Coordination
///
/// On a miss, callers race to register as the loader for that name. The
/// winner loads, populates the cache, releases the registration, and then
/// hands the result to everyone who queued behind it. Waiters never start a
/// second load; they receive the same entry or the same error. Failures are
/// not cached, so the next caller after a failure retries.
///
/// Names are coordinated independently: loads for different names run in
/// parallel.
pub struct LockManager<S> {
    store: S,
    cache: Option<Arc<KeyCache>>,
    in_flight: DashMap<String, Arc<InFlight>>,
    counters: Counters,
}

impl<S: KeyStore> LockManager<S> {
    /// Creates a manager with an unbounded cache.
    pub fn new(store: S) -> Self {
        Self::with_strategy(store, CacheStrategy::default())
    }

    /// Creates a manager whose cache starts with `strategy`.
    pub fn with_strategy(store: S, strategy: CacheStrategy) -> Self {
        Self::with_cache(store, Arc::new(KeyCache::with_strategy(strategy)))
    }

    /// Creates a manager around an existing cache.
    pub fn with_cache(store: S, cache: Arc<KeyCache>) -> Self {
        Self {
            store,
            cache: Some(cache),
            in_flight: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Creates a manager that never retains keys.
    ///
    /// Concurrent lookups for one name still share a single load.
    pub fn without_cache(store: S) -> Self {
        Self {
            store,
            cache: None,
            in_flight: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// The key cache, or `None` if caching is disabled.
    pub fn cache(&self) -> Option<&Arc<KeyCache>> {
        self.cache.as_ref()
    }

    /// Returns true if loaded keys are cached.
    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// The backing key store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of loads currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns the lookup counters.
    pub fn stats(&self) -> LockStats {
        LockStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            load_failures: self.counters.load_failures.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }

    fn cached(&self, name: &str) -> Option<Arc<KeyEntry>> {
        self.cache.as_ref().and_then(|cache| cache.get(name))
    }

    /// Returns the key named `name`, loading it from the store on a miss.
    ///
    /// A cache hit returns without blocking.
    ///
    /// # Errors
    /// Returns the key store's error (e.g. `KeyNotFound`, `LoadFailure`,
    /// `StoreTimeout`) unchanged, or `InvalidKey` if the store returned an
    /// entry that fails validation.
    #[instrument(skip(self))]
    pub async fn get_key(&self, name: &str) -> Result<Arc<KeyEntry>> {
        if name.is_empty() {
            return Err(KeyCacheError::InvalidKey("key name cannot be empty".into()));
        }

        // Each call counts as exactly one hit or one miss, however often it retries
        let mut first_pass = true;
        loop {
            if let Some(entry) = self.cached(name) {
                if first_pass {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                }
                debug!("Cache hit");
                return Ok(entry);
            }
            if first_pass {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                first_pass = false;
            }

            let role = match self.in_flight.entry(name.to_string()) {
                Entry::Occupied(occupied) => Role::Waiter(occupied.get().subscribe()),
                Entry::Vacant(vacant) => {
                    let flight = Arc::new(InFlight::new());
                    vacant.insert(Arc::clone(&flight));
                    Role::Loader(Registration::new(&self.in_flight, name, flight))
                }
            };

            match role {
                Role::Loader(registration) => return self.load_as_owner(name, registration).await,
                Role::Waiter(mut rx) => {
                    self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!("Waiting on in-flight load");
                    let outcome = rx
                        .wait_for(Option::is_some)
                        .await
                        .ok()
                        .and_then(|outcome| outcome.clone());
                    match outcome {
                        Some(result) => return result,
                        // Loader was cancelled before publishing; start over
                        None => continue,
                    }
                }
            }
        }
    }

    async fn load_as_owner(
        &self,
        name: &str,
        registration: Registration<'_>,
    ) -> Result<Arc<KeyEntry>> {
        // A previous loader may have populated the cache after our miss
        if let Some(entry) = self.cached(name) {
            registration.release();
            registration.flight().publish(Ok(Arc::clone(&entry)));
            return Ok(entry);
        }

        self.counters.loads.fetch_add(1, Ordering::Relaxed);
        debug!("Loading key from store");

        let outcome = self.store.load(name).await.and_then(|entry| {
            if entry.name != name {
                return Err(KeyCacheError::InvalidKey(format!(
                    "key store returned '{}' for '{}'",
                    entry.name, name
                )));
            }
            entry.validate()?;
            Ok(Arc::new(entry))
        });

        match &outcome {
            Ok(entry) => {
                if let Some(cache) = &self.cache {
                    let flight = registration.flight();
                    if flight.is_stale() {
                        debug!("Key changed during load, not caching");
                    } else {
                        cache.put(name, Arc::clone(entry));
                        // Invalidated between the check and the put
                        if flight.is_stale() && cache.delete_if_same(name, entry) {
                            debug!("Key changed during load, dropped cached copy");
                        }
                    }
                }
            }
            Err(err) => {
                self.counters.load_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, recoverable = err.is_recoverable(), "Key load failed");
            }
        }

        registration.release();
        registration.flight().publish(outcome.clone());
        outcome
    }

    /// Marks the running load of `name` stale and unregisters it.
    ///
    /// Callers already waiting on it still get its result; later callers start
    /// a fresh load instead of joining the superseded one.
    fn detach_in_flight(&self, name: &str) {
        let flight = self.in_flight.get(name).map(|flight| Arc::clone(flight.value()));
        if let Some(flight) = flight {
            flight.mark_stale();
            self.in_flight
                .remove_if(name, |_, current| Arc::ptr_eq(current, &flight));
        }
    }

    /// Drops a cached key, e.g. after it was rotated or deleted in the store.
    ///
    /// A load of the same name that is still running will not cache its
    /// result, and lookups that start afterwards do not join it.
    pub fn invalidate(&self, name: &str) {
        self.detach_in_flight(name);
        if let Some(cache) = &self.cache {
            cache.delete(name);
        }
        debug!(key = name, "Invalidated cached key");
    }

    /// Writes a key to the store and replaces the cached copy.
    ///
    /// # Errors
    /// Returns `InvalidKey` if the entry fails validation, or the store's error.
    #[instrument(skip(self, entry), fields(key = %entry.name))]
    pub async fn store_key(&self, entry: KeyEntry) -> Result<Arc<KeyEntry>> {
        entry.validate()?;
        self.store.store(&entry).await?;

        let entry = Arc::new(entry);
        self.detach_in_flight(&entry.name);
        if let Some(cache) = &self.cache {
            cache.put(entry.name.clone(), Arc::clone(&entry));
        }
        Ok(entry)
    }

    /// Deletes a key from the store and the cache.
    #[instrument(skip(self))]
    pub async fn delete_key(&self, name: &str) -> Result<()> {
        self.store.delete(name).await?;
        self.invalidate(name);
        Ok(())
    }
}

impl<S> std::fmt::Debug for LockManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("cache", &self.cache)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
