//! Error types for KEYCACHE.
//!
//! This module provides the error hierarchy shared by every KEYCACHE crate.
//! Errors are `Clone` so a single load failure can be handed, unchanged, to
//! every caller that was waiting on the same key.

use thiserror::Error;

/// Result type alias using `KeyCacheError`.
pub type Result<T> = std::result::Result<T, KeyCacheError>;

/// Main error type for all KEYCACHE operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyCacheError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Requested cache strategy is not valid (e.g. bounded with zero capacity).
    #[error("Invalid cache configuration: {0}")]
    InvalidConfiguration(String),

    /// Mount or environment configuration could not be parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // KEY STORE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Loading a key from the key store failed.
    #[error("Failed to load key '{name}': {reason}")]
    LoadFailure {
        /// Key name
        name: String,
        /// Store-provided cause
        reason: String,
    },

    /// The key store has no key with this name.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The key store did not answer in time.
    #[error("Key store timeout loading '{name}' after {millis}ms")]
    StoreTimeout {
        /// Key name
        name: String,
        /// Elapsed time before giving up
        millis: u64,
    },

    /// Generic key store failure.
    #[error("Key store error: {0}")]
    StoreError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Key entry failed validation.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl KeyCacheError {
    /// Returns true if a later attempt may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KeyCacheError::LoadFailure { .. }
                | KeyCacheError::StoreTimeout { .. }
                | KeyCacheError::StoreError(_)
        )
    }
}
