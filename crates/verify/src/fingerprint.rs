//! Content fingerprints: BLAKE3 output truncated to 20 bytes.
//!
//! The social protocol identifies every message by this value and signs it
//! in place of the raw message bytes, so the same fingerprint serves as both
//! the escrow key and the signed digest.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fingerprint length in bytes.
pub const HASH_LEN: usize = 20;

/// A 20-byte message fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MessageHash(pub [u8; HASH_LEN]);

impl MessageHash {
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Parse exactly 20 bytes; any other length yields `None`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; HASH_LEN]>::try_from(bytes).ok().map(Self)
    }
}

/// Fingerprint an arbitrary payload.
pub fn fingerprint(payload: &[u8]) -> MessageHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(payload);
    let mut out = [0u8; HASH_LEN];
    hasher.finalize_xof().fill(&mut out);
    MessageHash(out)
}

impl fmt::Display for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageHash(0x{self})")
    }
}

impl FromStr for MessageHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches("0x");
        let mut out = [0u8; HASH_LEN];
        hex::decode_to_slice(trimmed, &mut out)?;
        Ok(Self(out))
    }
}

impl Serialize for MessageHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MessageHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
