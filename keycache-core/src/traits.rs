//! Common traits for KEYCACHE.
//!
//! These traits define the narrow interfaces the cache talks to, so tests and
//! benchmarks can swap in their own implementations.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::KeyEntry;

// ═══════════════════════════════════════════════════════════════════════════════
// KEY STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface to the backing key store.
///
/// The cache only ever calls [`KeyStore::load`] on a miss. The write methods
/// exist for callers that rotate or delete keys through the lock manager.
///
/// Implementations might use:
/// - In-memory storage (for testing/benchmarks)
/// - The surrounding secret engine's encrypted storage (for production)
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Loads and decodes a key by name.
    ///
    /// # Errors
    /// Returns `KeyNotFound` if the store has no such key, or any other error
    /// if the fetch itself failed. Errors are propagated to every caller
    /// waiting on the same key and are never cached.
    async fn load(&self, name: &str) -> Result<KeyEntry>;

    /// Writes (inserts or replaces) a key.
    async fn store(&self, entry: &KeyEntry) -> Result<()>;

    /// Deletes a key. Deleting a missing key is not an error.
    async fn delete(&self, name: &str) -> Result<()>;
}

#[async_trait]
impl<T: KeyStore + ?Sized> KeyStore for std::sync::Arc<T> {
    async fn load(&self, name: &str) -> Result<KeyEntry> {
        (**self).load(name).await
    }

    async fn store(&self, entry: &KeyEntry) -> Result<()> {
        (**self).store(entry).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        (**self).delete(name).await
    }
}
