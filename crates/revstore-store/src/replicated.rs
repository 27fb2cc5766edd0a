//! A local blob store backed by a remote replica.
//!
//! Sparse local replicas hold only part of the content. Reads that miss
//! locally go to the remote and the fetched blob is written back, so the
//! next read is local. Only bytes that hash to their address are written
//! back. Writes only touch the local store.

use async_trait::async_trait;
use bytes::Bytes;
use revstore_core::ContentAddress;

use crate::error::Result;
use crate::traits::BlobStore;

/// Read-through pairing of a local and a remote [`BlobStore`].
pub struct ReplicatedBlobStore<L, R> {
    local: L,
    remote: R,
}

impl<L: BlobStore, R: BlobStore> ReplicatedBlobStore<L, R> {
    pub fn new(local: L, remote: R) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }
}

#[async_trait]
impl<L: BlobStore, R: BlobStore> BlobStore for ReplicatedBlobStore<L, R> {
    async fn get_blob(&self, address: &ContentAddress) -> Result<Option<Bytes>> {
        if let Some(bytes) = self.local.get_blob(address).await? {
            return Ok(Some(bytes));
        }

        let Some(bytes) = self.remote.get_blob(address).await? else {
            return Ok(None);
        };

        let actual = ContentAddress::compute(&bytes);
        if actual != *address {
            // Not cached; the content adapter reports the corruption.
            tracing::warn!(%address, %actual, "remote blob does not match its address");
            return Ok(Some(bytes));
        }

        tracing::debug!(%address, size = bytes.len(), "fetched blob from remote");
        self.local.put_blob(address, bytes.clone()).await?;
        Ok(Some(bytes))
    }

    async fn put_blob(&self, address: &ContentAddress, bytes: Bytes) -> Result<bool> {
        self.local.put_blob(address, bytes).await
    }

    async fn has_blob(&self, address: &ContentAddress) -> Result<bool> {
        if self.local.has_blob(address).await? {
            return Ok(true);
        }
        self.remote.has_blob(address).await
    }
}
