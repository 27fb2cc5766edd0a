//! In-memory implementation of the storage traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use revstore_core::{ContentAddress, EnvelopeKind, NodeIdentity};

use crate::error::{Result, StoreError};
use crate::traits::{BlobStore, InsertResult, NodeStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Encoded envelopes indexed by keyspace and identity.
    envelopes: HashMap<(EnvelopeKind, NodeIdentity), Bytes>,

    /// Blobs indexed by content address.
    blobs: HashMap<ContentAddress, Bytes>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Number of stored envelopes across both keyspaces.
    pub fn envelope_count(&self) -> Result<usize> {
        Ok(self.read()?.envelopes.len())
    }

    /// Number of distinct stored blobs.
    pub fn blob_count(&self) -> Result<usize> {
        Ok(self.read()?.blobs.len())
    }

    /// Overwrite a blob in place, bypassing content addressing.
    ///
    /// Only useful for simulating on-disk corruption in tests.
    pub fn corrupt_blob(&self, address: &ContentAddress, bytes: Bytes) -> Result<()> {
        self.write()?.blobs.insert(*address, bytes);
        Ok(())
    }

    /// Overwrite an envelope in place, bypassing the conflict check.
    ///
    /// Only useful for simulating on-disk corruption in tests.
    pub fn corrupt_envelope(
        &self,
        kind: EnvelopeKind,
        node_id: &NodeIdentity,
        bytes: Bytes,
    ) -> Result<()> {
        self.write()?.envelopes.insert((kind, *node_id), bytes);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn insert_envelope(
        &self,
        kind: EnvelopeKind,
        node_id: &NodeIdentity,
        bytes: &[u8],
    ) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if let Some(existing) = inner.envelopes.get(&(kind, *node_id)) {
            return Ok(if existing.as_ref() == bytes {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Conflict
            });
        }

        inner
            .envelopes
            .insert((kind, *node_id), Bytes::copy_from_slice(bytes));
        Ok(InsertResult::Inserted)
    }

    async fn get_envelope(
        &self,
        kind: EnvelopeKind,
        node_id: &NodeIdentity,
    ) -> Result<Option<Bytes>> {
        Ok(self.read()?.envelopes.get(&(kind, *node_id)).cloned())
    }

    async fn get_envelopes(
        &self,
        kind: EnvelopeKind,
        node_ids: &[NodeIdentity],
    ) -> Result<HashMap<NodeIdentity, Bytes>> {
        let inner = self.read()?;
        Ok(node_ids
            .iter()
            .filter_map(|id| {
                inner
                    .envelopes
                    .get(&(kind, *id))
                    .map(|bytes| (*id, bytes.clone()))
            })
            .collect())
    }

    async fn has_envelope(&self, kind: EnvelopeKind, node_id: &NodeIdentity) -> Result<bool> {
        Ok(self.read()?.envelopes.contains_key(&(kind, *node_id)))
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get_blob(&self, address: &ContentAddress) -> Result<Option<Bytes>> {
        Ok(self.read()?.blobs.get(address).cloned())
    }

    async fn put_blob(&self, address: &ContentAddress, bytes: Bytes) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.blobs.contains_key(address) {
            return Ok(false);
        }
        inner.blobs.insert(*address, bytes);
        Ok(true)
    }

    async fn has_blob(&self, address: &ContentAddress) -> Result<bool> {
        Ok(self.read()?.blobs.contains_key(address))
    }
}
