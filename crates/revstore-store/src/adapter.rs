//! Content adapter: the envelope layer's view of the blob store.
//!
//! Addresses are derived from the bytes, so a put of known bytes is a
//! no-op at the physical layer. A miss on `get` is normal and retryable.
//! The adapter knows nothing about `content_size`.

use std::sync::Arc;

use bytes::Bytes;
use revstore_core::ContentAddress;

use crate::error::ContentError;
use crate::traits::BlobStore;

/// Content-addressed access to a [`BlobStore`].
pub struct ContentAdapter<B> {
    blobs: Arc<B>,
    verify: bool,
}

impl<B> Clone for ContentAdapter<B> {
    fn clone(&self) -> Self {
        Self {
            blobs: self.blobs.clone(),
            verify: self.verify,
        }
    }
}

impl<B: BlobStore> ContentAdapter<B> {
    /// Wrap a blob store. Fetched bytes are hash-checked against their
    /// address.
    pub fn new(blobs: Arc<B>) -> Self {
        Self {
            blobs,
            verify: true,
        }
    }

    /// Turn fetch-time hash checking on or off.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// The underlying blob store.
    pub fn blobs(&self) -> &Arc<B> {
        &self.blobs
    }

    /// Store `bytes`, returning their address.
    pub async fn put(&self, bytes: Bytes) -> Result<ContentAddress, ContentError> {
        let address = ContentAddress::compute(&bytes);
        let size = bytes.len();
        if self.blobs.put_blob(&address, bytes).await? {
            tracing::debug!(%address, size, "stored blob");
        } else {
            tracing::debug!(%address, "blob already present");
        }
        Ok(address)
    }

    /// Fetch the bytes at `address`.
    pub async fn get(&self, address: &ContentAddress) -> Result<Bytes, ContentError> {
        let bytes = self
            .blobs
            .get_blob(address)
            .await?
            .ok_or(ContentError::Missing(*address))?;

        if self.verify {
            let actual = ContentAddress::compute(&bytes);
            if actual != *address {
                tracing::warn!(%address, %actual, "corrupt blob");
                return Err(ContentError::Corrupt {
                    address: *address,
                    actual,
                });
            }
        }

        Ok(bytes)
    }

    pub async fn contains(&self, address: &ContentAddress) -> Result<bool, ContentError> {
        Ok(self.blobs.has_blob(address).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn test_put_get() {
        let store = Arc::new(MemoryStore::new());
        let adapter = ContentAdapter::new(store.clone());

        let address = adapter.put(Bytes::from_static(b"hello\n")).await.unwrap();
        assert_eq!(address, ContentAddress::compute(b"hello\n"));
        assert_eq!(&adapter.get(&address).await.unwrap()[..], b"hello\n");
        assert!(adapter.contains(&address).await.unwrap());
    }

    #[tokio::test]
    async fn test_identical_bytes_share_one_blob() {
        let store = Arc::new(MemoryStore::new());
        let adapter = ContentAdapter::new(store.clone());

        let a = adapter.put(Bytes::from_static(b"same")).await.unwrap();
        let b = adapter.put(Bytes::from_static(b"same")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.blob_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_is_retryable() {
        let adapter = ContentAdapter::new(Arc::new(MemoryStore::new()));
        let address = ContentAddress::compute(b"nowhere");

        let err = adapter.get(&address).await.unwrap_err();
        assert!(matches!(err, ContentError::Missing(a) if a == address));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_corrupt_blob_detected() {
        let store = Arc::new(MemoryStore::new());
        let adapter = ContentAdapter::new(store.clone());
        let address = adapter.put(Bytes::from_static(b"good")).await.unwrap();
        store
            .corrupt_blob(&address, Bytes::from_static(b"evil"))
            .unwrap();

        let err = adapter.get(&address).await.unwrap_err();
        assert!(matches!(err, ContentError::Corrupt { .. }));
        assert!(!err.is_retryable());

        // Without verification the bytes come back as stored.
        let unchecked = adapter.clone().with_verification(false);
        assert_eq!(&unchecked.get(&address).await.unwrap()[..], b"evil");
    }
}
