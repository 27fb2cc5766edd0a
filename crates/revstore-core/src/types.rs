//! Hash domain newtypes.
//!
//! [`NodeIdentity`] names a revision in the legacy parent-linked hash tree.
//! [`ContentAddress`] names raw bytes in the blob store. The two are never
//! interchangeable and there is deliberately no conversion between them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MalformedHash;

/// A 20-byte historical node identity (SHA-1 over parents and content).
///
/// This is the only key under which envelopes are stored. Manifests and
/// files use the same width and algorithm but live in separate keyspaces.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIdentity([u8; 20]);

impl NodeIdentity {
    /// Width of a node identity in bytes.
    pub const LEN: usize = 20;

    /// Create from a fixed-size array.
    pub const fn from_array(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create from a byte slice, rejecting any other width.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedHash> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| MalformedHash {
            domain: "node identity",
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != Self::LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIdentity({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for NodeIdentity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 20]> for NodeIdentity {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for NodeIdentity {
    type Error = MalformedHash;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(slice)
    }
}

/// A 32-byte physical content address (Blake3 of the raw bytes).
///
/// Byte-identical content always maps to the same address, which makes the
/// address the deduplication key of the blob store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentAddress([u8; 32]);

impl ContentAddress {
    /// Width of a content address in bytes.
    pub const LEN: usize = 32;

    /// Compute the address of the given content.
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create from a fixed-size array.
    pub const fn from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a byte slice, rejecting any other width.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedHash> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| MalformedHash {
            domain: "content address",
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != Self::LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for ContentAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for ContentAddress {
    type Error = MalformedHash;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(slice)
    }
}
