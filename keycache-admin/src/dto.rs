//! Request and response types for the `cache-config` path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AdminError;

/// Field name of the cache type.
pub const FIELD_CACHE_TYPE: &str = "cache-type";
/// Field name of the LRU capacity.
pub const FIELD_CACHE_SIZE: &str = "cache-size";
/// Field name of the opt-in length computation flag.
pub const FIELD_COMPUTE_CACHE_LENGTH: &str = "compute-cache-length";
/// Field name of the reported entry count.
pub const FIELD_CACHE_LENGTH: &str = "cache-length";

/// Request to change the cache strategy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfigWriteRequest {
    /// `"syncmap"` or `"lru"`
    #[serde(rename = "cache-type")]
    pub cache_type: String,
    /// LRU capacity; required for `"lru"`
    #[serde(rename = "cache-size", default, skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<i64>,
}

impl CacheConfigWriteRequest {
    /// Request for the given type and optional size.
    pub fn new(cache_type: impl Into<String>, cache_size: Option<i64>) -> Self {
        Self {
            cache_type: cache_type.into(),
            cache_size,
        }
    }

    /// Parses a loosely-typed field map.
    ///
    /// `cache-size` may be a JSON number or a numeric string.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, AdminError> {
        let cache_type = string_field(fields, FIELD_CACHE_TYPE)?.ok_or_else(|| {
            AdminError::invalid_request(format!("missing required field {}", FIELD_CACHE_TYPE))
        })?;
        let cache_size = int_field(fields, FIELD_CACHE_SIZE)?;
        Ok(Self {
            cache_type,
            cache_size,
        })
    }
}

/// Request to read the cache configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfigReadRequest {
    /// Also count resident entries. Can be slow on large unbounded caches.
    #[serde(rename = "compute-cache-length", default)]
    pub compute_cache_length: bool,
}

impl CacheConfigReadRequest {
    /// Parses a loosely-typed field map.
    ///
    /// `compute-cache-length` may be a JSON bool or `"true"`/`"false"`.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, AdminError> {
        Ok(Self {
            compute_cache_length: bool_field(fields, FIELD_COMPUTE_CACHE_LENGTH)?.unwrap_or(false),
        })
    }
}

/// Current cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfigResponse {
    /// `"syncMap"`, `"lru"`, or `"unknown"`
    #[serde(rename = "cache-type")]
    pub cache_type: String,
    /// Resident entry count, present only when requested
    #[serde(rename = "cache-length", default, skip_serializing_if = "Option::is_none")]
    pub cache_length: Option<usize>,
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<Option<String>, AdminError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(AdminError::invalid_request(format!("{} must be a string", name))),
    }
}

fn int_field(fields: &Map<String, Value>, name: &str) -> Result<Option<i64>, AdminError> {
    let invalid = || AdminError::invalid_request(format!("{} must be an integer", name));
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn bool_field(fields: &Map<String, Value>, name: &str) -> Result<Option<bool>, AdminError> {
    let invalid = || AdminError::invalid_request(format!("{} must be a boolean", name));
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => s.trim().parse::<bool>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}
