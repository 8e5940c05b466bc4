//! Key types for KEYCACHE.
//!
//! This module defines the decoded key objects the cache holds:
//!
//! - [`KeyMaterial`]: Raw secret bytes for one key version (zeroized on drop)
//! - [`KeyVersion`]: One version of a named key
//! - [`KeyType`]: Algorithm family of a named key
//! - [`KeyEntry`]: A named key with all of its versions
//!
//! The cache treats a [`KeyEntry`] as opaque. It never inspects versions or
//! material, and an entry is never mutated once it has been cached.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::MAX_KEY_NAME_LEN;
use crate::error::{Result, KeyCacheError};

// ═══════════════════════════════════════════════════════════════════════════════
// KEY MATERIAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Secret bytes of a single key version.
///
/// Zeroized when dropped. Never expose this in logs or error messages.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: Vec<u8>,
}

impl KeyMaterial {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Returns the raw bytes.
    ///
    /// # Security
    /// Handle the returned bytes carefully - do not log or expose them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the material in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if there is no material.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the hex-encoded material.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Creates material from a hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| KeyCacheError::InvalidKey(e.to_string()))?;
        Ok(Self { bytes })
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial([REDACTED; {}])", self.bytes.len())
    }
}

impl Serialize for KeyMaterial {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for KeyMaterial {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Algorithm family of a named key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// AES-256 in GCM mode with a 96-bit nonce.
    #[default]
    #[serde(rename = "aes256-gcm96")]
    Aes256Gcm96,
    /// ChaCha20-Poly1305 AEAD.
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
    /// Ed25519 signing key.
    #[serde(rename = "ed25519")]
    Ed25519,
    /// ECDSA over NIST P-256.
    #[serde(rename = "ecdsa-p256")]
    EcdsaP256,
    /// 2048-bit RSA.
    #[serde(rename = "rsa-2048")]
    Rsa2048,
}

impl KeyType {
    /// Wire name of this key type.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Aes256Gcm96 => "aes256-gcm96",
            KeyType::ChaCha20Poly1305 => "chacha20-poly1305",
            KeyType::Ed25519 => "ed25519",
            KeyType::EcdsaP256 => "ecdsa-p256",
            KeyType::Rsa2048 => "rsa-2048",
        }
    }

    /// Size in bytes of freshly generated material for this type.
    pub fn material_size(&self) -> usize {
        match self {
            KeyType::Aes256Gcm96 | KeyType::ChaCha20Poly1305 | KeyType::Ed25519 => 32,
            KeyType::EcdsaP256 => 32,
            KeyType::Rsa2048 => 256,
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY VERSION
// ═══════════════════════════════════════════════════════════════════════════════

/// A single version of a named key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyVersion {
    /// Secret material (redacted in Debug)
    pub material: KeyMaterial,
    /// When this version was created
    pub created_at: DateTime<Utc>,
}

impl KeyVersion {
    /// Creates a version stamped with the current time.
    pub fn new(material: KeyMaterial) -> Self {
        Self {
            material,
            created_at: Utc::now(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY ENTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// A decoded, named key with all of its versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    /// Unique key name
    pub name: String,
    /// Algorithm family
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Highest version number in `versions`
    pub latest_version: u32,
    /// Oldest version still allowed for decryption
    pub min_decryption_version: u32,
    /// Whether the key may be deleted
    pub deletion_allowed: bool,
    /// Whether the key material may be exported
    pub exportable: bool,
    /// Version number → material
    pub versions: BTreeMap<u32, KeyVersion>,
}

impl KeyEntry {
    /// Creates a key with a single version (version 1).
    pub fn new(name: impl Into<String>, key_type: KeyType, material: KeyMaterial) -> Self {
        let mut versions = BTreeMap::new();
        versions.insert(1, KeyVersion::new(material));
        Self {
            name: name.into(),
            key_type,
            latest_version: 1,
            min_decryption_version: 1,
            deletion_allowed: false,
            exportable: false,
            versions,
        }
    }

    /// Returns a copy of this key with a new latest version appended.
    ///
    /// Cached entries are immutable; rotation produces a new entry which the
    /// caller writes to the store and re-caches.
    pub fn rotated(&self, material: KeyMaterial) -> Self {
        let mut next = self.clone();
        next.latest_version += 1;
        next.versions
            .insert(next.latest_version, KeyVersion::new(material));
        next
    }

    /// Returns the latest version of the key.
    pub fn latest(&self) -> Option<&KeyVersion> {
        self.versions.get(&self.latest_version)
    }

    /// Returns a specific version of the key.
    pub fn version(&self, version: u32) -> Option<&KeyVersion> {
        self.versions.get(&version)
    }

    /// Validates structural invariants.
    ///
    /// # Errors
    /// Returns `InvalidKey` if the name is empty or too long, there are no
    /// versions, or the latest/minimum versions do not exist.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(KeyCacheError::InvalidKey("key name cannot be empty".into()));
        }
        if self.name.len() > MAX_KEY_NAME_LEN {
            return Err(KeyCacheError::InvalidKey(format!(
                "key name exceeds {} bytes",
                MAX_KEY_NAME_LEN
            )));
        }
        if self.versions.is_empty() {
            return Err(KeyCacheError::InvalidKey(format!(
                "key '{}' has no versions",
                self.name
            )));
        }
        if !self.versions.contains_key(&self.latest_version) {
            return Err(KeyCacheError::InvalidKey(format!(
                "key '{}' latest version {} does not exist",
                self.name, self.latest_version
            )));
        }
        if !self.versions.contains_key(&self.min_decryption_version) {
            return Err(KeyCacheError::InvalidKey(format!(
                "key '{}' min_decryption_version {} does not exist",
                self.name, self.min_decryption_version
            )));
        }
        Ok(())
    }
}
