//! The `cache-config` path: schema, help text, and handlers.

use serde_json::{Map, Value};
use tracing::info;

use keycache_core::constants::{
    CACHE_TYPE_LRU, CACHE_TYPE_SYNCMAP, CACHE_TYPE_SYNCMAP_DISPLAY, CACHE_TYPE_UNKNOWN,
};
use keycache_core::traits::KeyStore;
use keycache_core::types::CacheKind;

use crate::dto::{
    CacheConfigReadRequest, CacheConfigResponse, CacheConfigWriteRequest, FIELD_CACHE_SIZE,
    FIELD_CACHE_TYPE, FIELD_COMPUTE_CACHE_LENGTH,
};
use crate::error::AdminError;
use crate::state::MountState;

type Result<T> = std::result::Result<T, AdminError>;

/// Path pattern the routing layer mounts these handlers under.
pub const PATH_PATTERN: &str = "cache-config";

/// One-line help for the path.
pub const HELP_SYNOPSIS: &str = "Configure caching strategy";

/// Long help for the path.
pub const HELP_DESCRIPTION: &str = r#"
This path is used to configure the caching strategy for the mount's decoded
keys. Writing "cache-type" replaces the active cache with an empty one of the
requested type; previously cached keys are reloaded from storage on demand.
Reading returns the active cache type and, if "compute-cache-length" is set,
the number of cached keys.
"#;

const LRU_SIZE_REQUIRED: &str =
    "for lru cache-type, cache-size must be specified and be greater than zero";

/// Operations the path accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Create the configuration (same as update).
    Create,
    /// Replace the configuration.
    Update,
    /// Read the configuration.
    Read,
}

/// Type of a path field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Signed integer
    Int,
    /// Boolean
    Bool,
}

/// Declared field of the path.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    /// Field name on the wire
    pub name: &'static str,
    /// Expected type
    pub field_type: FieldType,
    /// Whether the write operation requires it
    pub required: bool,
    /// Value used when absent
    pub default: Option<Value>,
    /// Help text
    pub description: &'static str,
}

/// Schema of the path for the routing layer's help and validation.
#[derive(Clone, Debug)]
pub struct PathSchema {
    /// Path pattern
    pub pattern: &'static str,
    /// Declared fields
    pub fields: Vec<FieldSchema>,
    /// Accepted operations
    pub operations: Vec<Operation>,
    /// One-line help
    pub help_synopsis: &'static str,
    /// Long help
    pub help_description: &'static str,
}

/// Returns the schema of the `cache-config` path.
pub fn cache_config_path() -> PathSchema {
    PathSchema {
        pattern: PATH_PATTERN,
        fields: vec![
            FieldSchema {
                name: FIELD_CACHE_TYPE,
                field_type: FieldType::String,
                required: true,
                default: None,
                description: r#"Type of cache to use. Currently "syncmap" and "lru" are supported."#,
            },
            FieldSchema {
                name: FIELD_CACHE_SIZE,
                field_type: FieldType::Int,
                required: false,
                default: Some(Value::from(0)),
                description: "Size of cache for a cache type that accepts a size. Required for \
                              cache types that accept a size; currently applies only to \"lru\".",
            },
            FieldSchema {
                name: FIELD_COMPUTE_CACHE_LENGTH,
                field_type: FieldType::Bool,
                required: false,
                default: Some(Value::Bool(false)),
                description: "When reading the current cache-type, also compute the number of \
                              items in the cache. This can be a long operation for large syncmap caches.",
            },
        ],
        operations: vec![Operation::Create, Operation::Update, Operation::Read],
        help_synopsis: HELP_SYNOPSIS,
        help_description: HELP_DESCRIPTION,
    }
}

/// Applies a new cache strategy to the mount.
///
/// Validation happens before anything is touched: a rejected request leaves
/// the active strategy and its entries as they were.
///
/// # Errors
/// `InvalidRequest` for an unknown `cache-type`, an `"lru"` request without a
/// positive `cache-size`, or a mount with caching disabled.
pub fn write_cache_config<S: KeyStore>(
    state: &MountState<S>,
    req: &CacheConfigWriteRequest,
) -> Result<()> {
    let kind = match req.cache_type.as_str() {
        CACHE_TYPE_SYNCMAP => CacheKind::Unbounded,
        CACHE_TYPE_LRU => CacheKind::Bounded,
        other => {
            return Err(AdminError::invalid_request(format!(
                "unknown cache-type {}",
                other
            )))
        }
    };

    let size = match kind {
        CacheKind::Unbounded => None,
        CacheKind::Bounded => Some(
            req.cache_size
                .filter(|size| *size > 0)
                .and_then(|size| usize::try_from(size).ok())
                .ok_or_else(|| AdminError::invalid_request(LRU_SIZE_REQUIRED))?,
        ),
    };

    let cache = state
        .lock_manager
        .cache()
        .ok_or_else(|| AdminError::invalid_request("caching is disabled for this mount"))?;

    let strategy = cache.switch_to(kind, size)?;
    info!(strategy = %strategy, "Applied cache-config");
    Ok(())
}

/// Reports the mount's cache strategy.
///
/// Entries are only counted when `compute_cache_length` is set.
pub fn read_cache_config<S: KeyStore>(
    state: &MountState<S>,
    req: &CacheConfigReadRequest,
) -> CacheConfigResponse {
    let Some(cache) = state.lock_manager.cache() else {
        return CacheConfigResponse {
            cache_type: CACHE_TYPE_UNKNOWN.to_string(),
            cache_length: req.compute_cache_length.then_some(0),
        };
    };

    let cache_type = match cache.current_kind() {
        CacheKind::Unbounded => CACHE_TYPE_SYNCMAP_DISPLAY,
        CacheKind::Bounded => CACHE_TYPE_LRU,
    };

    CacheConfigResponse {
        cache_type: cache_type.to_string(),
        cache_length: req.compute_cache_length.then(|| cache.len()),
    }
}

/// Dispatches a raw field map by operation.
///
/// Writes return `Ok(None)`; reads return the configuration.
pub fn handle<S: KeyStore>(
    state: &MountState<S>,
    operation: Operation,
    fields: &Map<String, Value>,
) -> Result<Option<CacheConfigResponse>> {
    match operation {
        Operation::Create | Operation::Update => {
            let req = CacheConfigWriteRequest::from_fields(fields)?;
            write_cache_config(state, &req)?;
            Ok(None)
        }
        Operation::Read => {
            let req = CacheConfigReadRequest::from_fields(fields)?;
            Ok(Some(read_cache_config(state, &req)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use test_case::test_case;

    use keycache_core::types::{CacheStrategy, KeyType};
    use keycache_store::MemoryKeyStore;

    use crate::state::MountConfig;

    fn mount() -> MountState<Arc<MemoryKeyStore>> {
        let store = Arc::new(MemoryKeyStore::seeded(20, KeyType::Aes256Gcm96));
        MountState::new(MountConfig::default(), store)
    }

    async fn warm(state: &MountState<Arc<MemoryKeyStore>>, count: usize) {
        for i in 0..count {
            state.lock_manager.get_key(&format!("key-{}", i)).await.unwrap();
        }
    }

    fn read(state: &MountState<Arc<MemoryKeyStore>>, compute: bool) -> CacheConfigResponse {
        read_cache_config(
            state,
            &CacheConfigReadRequest {
                compute_cache_length: compute,
            },
        )
    }

    #[test]
    fn test_syncmap_round_trip() {
        let state = mount();
        write_cache_config(&state, &CacheConfigWriteRequest::new("syncmap", None)).unwrap();
        assert_eq!(read(&state, false).cache_type, "syncMap");
    }

    #[test]
    fn test_lru_round_trip() {
        let state = mount();
        write_cache_config(&state, &CacheConfigWriteRequest::new("lru", Some(500))).unwrap();

        assert_eq!(read(&state, false).cache_type, "lru");
        assert_eq!(
            state.lock_manager.cache().unwrap().current_strategy(),
            CacheStrategy::bounded(500).unwrap()
        );
    }

    #[test_case("fifo", Some(10), "unknown cache-type fifo" ; "unknown type")]
    #[test_case("LRU", Some(10), "unknown cache-type LRU" ; "case sensitive")]
    #[test_case("", None, "unknown cache-type " ; "empty type")]
    #[test_case("lru", None, LRU_SIZE_REQUIRED ; "lru without size")]
    #[test_case("lru", Some(0), LRU_SIZE_REQUIRED ; "lru zero size")]
    #[test_case("lru", Some(-3), LRU_SIZE_REQUIRED ; "lru negative size")]
    fn test_write_rejected(cache_type: &str, size: Option<i64>, message: &str) {
        let state = mount();
        let err = write_cache_config(&state, &CacheConfigWriteRequest::new(cache_type, size))
            .unwrap_err();

        assert_eq!(err, AdminError::InvalidRequest(message.into()));
        assert_eq!(
            state.lock_manager.cache().unwrap().current_strategy(),
            CacheStrategy::Unbounded
        );
    }

    #[tokio::test]
    async fn test_rejected_write_keeps_entries() {
        let state = mount();
        warm(&state, 5).await;

        let result = write_cache_config(&state, &CacheConfigWriteRequest::new("lru", Some(0)));

        assert!(result.is_err());
        assert_eq!(read(&state, true).cache_length, Some(5));
        assert_eq!(read(&state, false).cache_type, "syncMap");
    }

    #[tokio::test]
    async fn test_switch_clears_entries() {
        let state = mount();
        warm(&state, 8).await;
        assert_eq!(read(&state, true).cache_length, Some(8));

        write_cache_config(&state, &CacheConfigWriteRequest::new("lru", Some(3))).unwrap();

        assert_eq!(read(&state, true).cache_length, Some(0));
    }

    #[tokio::test]
    async fn test_rewrite_same_config_clears_entries() {
        let state = mount();
        warm(&state, 4).await;

        write_cache_config(&state, &CacheConfigWriteRequest::new("syncmap", None)).unwrap();

        assert_eq!(read(&state, true).cache_length, Some(0));
    }

    #[tokio::test]
    async fn test_length_counts_distinct_names() {
        let state = mount();
        warm(&state, 6).await;
        warm(&state, 6).await;

        let resp = read(&state, true);
        assert_eq!(resp.cache_length, Some(6));
        assert_eq!(read(&state, false).cache_length, None);
    }

    #[tokio::test]
    async fn test_length_bounded_by_capacity() {
        let state = mount();
        write_cache_config(&state, &CacheConfigWriteRequest::new("lru", Some(4))).unwrap();
        warm(&state, 10).await;

        assert_eq!(read(&state, true).cache_length, Some(4));
    }

    #[test]
    fn test_disabled_cache_reads_unknown_and_rejects_writes() {
        let store = Arc::new(MemoryKeyStore::new());
        let config = MountConfig {
            cache_enabled: false,
            ..MountConfig::default()
        };
        let state = MountState::new(config, store);

        let resp = read(&state, true);
        assert_eq!(resp.cache_type, "unknown");
        assert_eq!(resp.cache_length, Some(0));

        let err = write_cache_config(&state, &CacheConfigWriteRequest::new("syncmap", None));
        assert!(matches!(err, Err(AdminError::InvalidRequest(_))));
    }

    #[test]
    fn test_handle_dispatches_by_operation() {
        let state = mount();
        tokio_test::block_on(warm(&state, 3));
        let write = json!({"cache-type": "lru", "cache-size": "16"});

        let written = handle(&state, Operation::Update, write.as_object().unwrap()).unwrap();
        assert!(written.is_none());

        let read_fields = json!({"compute-cache-length": true});
        let resp = handle(&state, Operation::Read, read_fields.as_object().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(
            serde_json::to_value(resp).unwrap(),
            json!({"cache-type": "lru", "cache-length": 0})
        );
    }

    #[test]
    fn test_schema_declares_fields() {
        let schema = cache_config_path();
        assert_eq!(schema.pattern, "cache-config");
        assert_eq!(schema.help_synopsis, "Configure caching strategy");

        let names: Vec<_> = schema.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, ["cache-type", "cache-size", "compute-cache-length"]);
        assert!(schema.fields[0].required);
        assert_eq!(schema.fields[2].default, Some(Value::Bool(false)));
    }
}
