//! Constants for KEYCACHE.

// ═══════════════════════════════════════════════════════════════════════════════
// KEY LIMITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum length of a key name in bytes.
pub const MAX_KEY_NAME_LEN: usize = 512;

// ═══════════════════════════════════════════════════════════════════════════════
// ADMINISTRATIVE WIRE NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// `cache-type` value selecting the unbounded strategy on write.
pub const CACHE_TYPE_SYNCMAP: &str = "syncmap";

/// `cache-type` value reported on read for the unbounded strategy.
///
/// Differs in case from [`CACHE_TYPE_SYNCMAP`]; clients depend on both spellings.
pub const CACHE_TYPE_SYNCMAP_DISPLAY: &str = "syncMap";

/// `cache-type` value selecting the bounded LRU strategy.
pub const CACHE_TYPE_LRU: &str = "lru";

/// `cache-type` value reported when the strategy cannot be named.
pub const CACHE_TYPE_UNKNOWN: &str = "unknown";

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT VARIABLES
// ═══════════════════════════════════════════════════════════════════════════════

/// Disables caching for a mount when set to `true` or `1`.
pub const ENV_DISABLE_CACHE: &str = "KEYCACHE_DISABLE_CACHE";

/// Initial cache type for a mount (`syncmap` or `lru`).
pub const ENV_CACHE_TYPE: &str = "KEYCACHE_CACHE_TYPE";

/// Initial LRU capacity for a mount.
pub const ENV_CACHE_SIZE: &str = "KEYCACHE_CACHE_SIZE";
