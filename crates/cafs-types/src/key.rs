use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::KeyError;

/// Size in bytes of every content key (a full BLAKE2b digest).
pub const KEY_SIZE: usize = 64;

/// Length of the hexadecimal text form of a key.
pub const KEY_SIZE_HEX: usize = KEY_SIZE * 2;

/// Content-addressed key for a leaf or for a whole stream.
///
/// A `ContentKey` is a fixed-size digest. Keys are immutable values and
/// compare byte-wise; the canonical text form is lowercase hex, optionally
/// prefixed with a store path when used as a storage location.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey([u8; KEY_SIZE]);

impl ContentKey {
    /// Build a key from raw digest bytes.
    ///
    /// Fails with [`KeyError::BadKeySize`] unless `data` is exactly
    /// [`KEY_SIZE`] bytes long. Input is never truncated or padded.
    pub fn from_bytes(data: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; KEY_SIZE] = data.try_into().map_err(|_| KeyError::BadKeySize {
            key: data.to_vec(),
        })?;
        Ok(Self(arr))
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hex form with a store-path prefix in front.
    pub fn to_hex_with_prefix(&self, prefix: &str) -> String {
        let mut path = String::with_capacity(prefix.len() + KEY_SIZE_HEX);
        path.push_str(prefix);
        path.push_str(&self.to_hex());
        path
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

/// Concatenate keys into the flat leaf-directory encoding.
pub fn encode_keys(keys: &[ContentKey]) -> Vec<u8> {
    let mut out = Vec::with_capacity(keys.len() * KEY_SIZE);
    for key in keys {
        out.extend_from_slice(key.as_bytes());
    }
    out
}

/// Split a flat leaf-directory encoding back into keys, in order.
pub fn decode_keys(data: &[u8]) -> Result<Vec<ContentKey>, KeyError> {
    if data.len() % KEY_SIZE != 0 {
        return Err(KeyError::BadDirectoryLength { len: data.len() });
    }
    data.chunks_exact(KEY_SIZE)
        .map(ContentKey::from_bytes)
        .collect()
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({})", self.short_hex())
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<&[u8]> for ContentKey {
    type Error = KeyError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(data)
    }
}

impl From<[u8; KEY_SIZE]> for ContentKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<ContentKey> for [u8; KEY_SIZE] {
    fn from(key: ContentKey) -> Self {
        key.0
    }
}

impl Serialize for ContentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
