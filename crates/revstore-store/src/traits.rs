//! Storage traits: raw envelope persistence and the external blob store.
//!
//! Neither trait interprets the bytes it holds. Decoding and verification
//! happen above this layer.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use revstore_core::{ContentAddress, EnvelopeKind, NodeIdentity};

use crate::error::Result;

/// Result of inserting an encoded envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// The envelope was new and is now committed.
    Inserted,
    /// Byte-identical envelope already present (idempotent - not an error).
    AlreadyExists,
    /// Different bytes are already committed under this key.
    Conflict,
}

/// Append-only envelope persistence keyed by `(kind, node_id)`.
///
/// # Design Notes
///
/// - **Immutable keys**: once a key holds bytes, those bytes never change.
/// - **Atomic insert**: the compare and the write happen as one step, so
///   concurrent writers of the same key see exactly one `Inserted`.
/// - **Independent keys**: no ordering is promised between different keys.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Insert encoded envelope bytes under `(kind, node_id)`.
    ///
    /// # Returns
    /// - `Inserted` if the key was free.
    /// - `AlreadyExists` if the key holds exactly these bytes.
    /// - `Conflict` if the key holds different bytes.
    async fn insert_envelope(
        &self,
        kind: EnvelopeKind,
        node_id: &NodeIdentity,
        bytes: &[u8],
    ) -> Result<InsertResult>;

    /// Get the encoded envelope stored under `(kind, node_id)`.
    async fn get_envelope(&self, kind: EnvelopeKind, node_id: &NodeIdentity)
        -> Result<Option<Bytes>>;

    /// Get many envelopes at once. Absent keys are simply left out.
    async fn get_envelopes(
        &self,
        kind: EnvelopeKind,
        node_ids: &[NodeIdentity],
    ) -> Result<HashMap<NodeIdentity, Bytes>> {
        let mut found = HashMap::with_capacity(node_ids.len());
        for id in node_ids {
            if let Some(bytes) = self.get_envelope(kind, id).await? {
                found.insert(*id, bytes);
            }
        }
        Ok(found)
    }

    /// Check whether a key is present without reading its bytes.
    async fn has_envelope(&self, kind: EnvelopeKind, node_id: &NodeIdentity) -> Result<bool>;
}

/// The physical blob store: bytes addressed by their content hash.
///
/// Failures here are transient (missing locally, network) rather than
/// structural.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the bytes stored at `address`.
    async fn get_blob(&self, address: &ContentAddress) -> Result<Option<Bytes>>;

    /// Store `bytes` at `address` unless something is already there.
    ///
    /// Returns `true` if a physical write happened. Implementations must
    /// make concurrent puts of one address perform at most one write.
    async fn put_blob(&self, address: &ContentAddress, bytes: Bytes) -> Result<bool>;

    /// Check whether `address` is present.
    async fn has_blob(&self, address: &ContentAddress) -> Result<bool>;
}
