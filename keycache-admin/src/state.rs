//! Mount state: configuration and the lock manager it owns.

use serde::{Deserialize, Serialize};

use keycache_core::constants::{
    CACHE_TYPE_LRU, CACHE_TYPE_SYNCMAP, ENV_CACHE_SIZE, ENV_CACHE_TYPE, ENV_DISABLE_CACHE,
};
use keycache_core::error::{Result, KeyCacheError};
use keycache_core::traits::KeyStore;
use keycache_core::types::{CacheKind, CacheStrategy};
use keycache_lock::LockManager;

/// Startup configuration of one mount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Whether loaded keys are cached at all
    pub cache_enabled: bool,
    /// Strategy the cache starts with
    pub default_strategy: CacheStrategy,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            default_strategy: CacheStrategy::Unbounded,
        }
    }
}

impl MountConfig {
    /// Reads the configuration from the process environment (and `.env`).
    ///
    /// # Errors
    /// Returns `ConfigError` for an unknown cache type or a bad size.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cache_enabled = !lookup(ENV_DISABLE_CACHE)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let size = match lookup(ENV_CACHE_SIZE) {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                KeyCacheError::ConfigError(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_CACHE_SIZE, raw
                ))
            })?),
            None => None,
        };

        let default_strategy = match lookup(ENV_CACHE_TYPE).as_deref() {
            None | Some(CACHE_TYPE_SYNCMAP) => CacheStrategy::Unbounded,
            Some(CACHE_TYPE_LRU) => CacheStrategy::new(CacheKind::Bounded, size).map_err(|_| {
                KeyCacheError::ConfigError(format!(
                    "{}={} requires {} greater than zero",
                    ENV_CACHE_TYPE, CACHE_TYPE_LRU, ENV_CACHE_SIZE
                ))
            })?,
            Some(other) => {
                return Err(KeyCacheError::ConfigError(format!(
                    "unknown {} '{}'",
                    ENV_CACHE_TYPE, other
                )))
            }
        };

        Ok(Self {
            cache_enabled,
            default_strategy,
        })
    }
}

/// Per-mount state handed by reference to every request handler.
pub struct MountState<S> {
    /// Startup configuration
    pub config: MountConfig,
    /// Cached key access for this mount
    pub lock_manager: LockManager<S>,
}

impl<S: KeyStore> MountState<S> {
    /// Builds the mount's lock manager from its configuration.
    pub fn new(config: MountConfig, store: S) -> Self {
        let lock_manager = if config.cache_enabled {
            LockManager::with_strategy(store, config.default_strategy)
        } else {
            LockManager::without_cache(store)
        };
        Self {
            config,
            lock_manager,
        }
    }
}
