//! The envelope store: codec, content adapter and verifier composed over
//! an append-only node store.
//!
//! Every write verifies before it commits, so a rejected write leaves
//! nothing behind. Reads decode and (by default) verify before returning.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use revstore_core::metadata::{needs_metadata_header, EMPTY_HEADER};
use revstore_core::{
    file_node_id, manifest_node_id, verify_file, verify_manifest, ContentAddress, EnvelopeKind,
    FileEnvelope, FileMetadata, ManifestEnvelope, NodeIdentity, Verification,
};
use revstore_store::{BlobStore, ContentAdapter, ContentError, InsertResult, NodeStore};

use crate::config::StoreConfig;
use crate::error::{EnvelopeError, Result};

/// Outcome of a successful put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The envelope was committed by this call.
    Stored(Verification),
    /// Identical bytes were already committed (idempotent).
    Duplicate(Verification),
}

impl PutOutcome {
    pub fn verification(&self) -> Verification {
        match self {
            Self::Stored(v) | Self::Duplicate(v) => *v,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Per-key result of a batch lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Missing,
    /// The envelope is stored but its content is not present locally.
    /// Retry once the blob has been fetched.
    ContentMissing(ContentAddress),
}

impl<T> Lookup<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Missing | Self::ContentMissing(_) => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Missing | Self::ContentMissing(_) => None,
        }
    }
}

/// Raw file revision handed over by ingestion.
#[derive(Debug, Clone, Default)]
pub struct FileRevision {
    pub parent1: Option<NodeIdentity>,
    pub parent2: Option<NodeIdentity>,
    /// Raw content, without any metadata header.
    pub content: Bytes,
    /// Complete metadata header, markers included.
    pub metadata: Option<Bytes>,
}

/// Raw manifest revision handed over by ingestion.
#[derive(Debug, Clone, Default)]
pub struct ManifestRevision {
    pub parent1: Option<NodeIdentity>,
    pub parent2: Option<NodeIdentity>,
    pub contents: Bytes,
    /// Identity asserted by the source history. When absent the computed
    /// identity is used.
    pub declared_node_id: Option<NodeIdentity>,
    /// Whether the manifest is the root of its snapshot tree.
    pub is_root: bool,
}

/// Verified, append-only storage of manifest and file envelopes.
///
/// `S` holds encoded envelopes; `B` holds file content. One backend may
/// serve as both.
pub struct EnvelopeStore<S: NodeStore, B: BlobStore> {
    nodes: Arc<S>,
    content: ContentAdapter<B>,
    config: StoreConfig,
}

impl<S: NodeStore, B: BlobStore> EnvelopeStore<S, B> {
    /// Create a store. Fails if `config` is invalid.
    pub fn new(nodes: Arc<S>, blobs: Arc<B>, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let content = ContentAdapter::new(blobs).with_verification(config.verify_blobs);
        Ok(Self {
            nodes,
            content,
            config,
        })
    }

    pub fn nodes(&self) -> &S {
        &self.nodes
    }

    /// The content adapter files resolve through.
    pub fn content(&self) -> &ContentAdapter<B> {
        &self.content
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify and commit a manifest envelope under `node_id`.
    pub async fn put_manifest(
        &self,
        node_id: &NodeIdentity,
        envelope: &ManifestEnvelope,
        is_root: bool,
    ) -> Result<PutOutcome> {
        check_key(node_id, &envelope.node_id)?;
        let verification = check_manifest(envelope, is_root)?;
        self.commit(EnvelopeKind::Manifest, node_id, &envelope.encode(), verification)
            .await
    }

    /// Verify and commit a file envelope under `node_id`.
    ///
    /// The referenced content must already be resolvable through the
    /// content adapter. A content-less envelope verifies against empty
    /// content.
    pub async fn put_file(
        &self,
        node_id: &NodeIdentity,
        envelope: &FileEnvelope,
    ) -> Result<PutOutcome> {
        check_key(node_id, &envelope.node_id)?;
        let content = self.resolve_content(envelope).await?;
        let verification = check_file(envelope, &content)?;
        self.commit(EnvelopeKind::File, node_id, &envelope.encode(), verification)
            .await
    }

    /// Store a raw file revision: content first, then its envelope.
    ///
    /// Content that itself starts with the metadata marker gets an empty
    /// header so the stored text stays unambiguous.
    pub async fn ingest_file(&self, revision: FileRevision) -> Result<FileEnvelope> {
        let metadata = match revision.metadata {
            Some(metadata) => {
                FileMetadata::parse(&metadata)?;
                Some(metadata)
            }
            None if needs_metadata_header(&revision.content) => {
                Some(Bytes::from_static(EMPTY_HEADER))
            }
            None => None,
        };

        let node_id = file_node_id(
            revision.parent1.as_ref(),
            revision.parent2.as_ref(),
            metadata.as_deref(),
            &revision.content,
        );
        let content_size = revision.content.len() as u64;
        let content_address = self.content.put(revision.content).await?;

        let envelope = FileEnvelope {
            node_id,
            parent1: revision.parent1,
            parent2: revision.parent2,
            content_address: Some(content_address),
            content_size,
            metadata,
        };
        self.put_file(&node_id, &envelope).await?;
        Ok(envelope)
    }

    /// Store a raw manifest revision.
    ///
    /// A declared identity that differs from the computed one is only
    /// accepted for a root manifest; the computed value is kept alongside
    /// it for recovery.
    pub async fn ingest_manifest(&self, revision: ManifestRevision) -> Result<ManifestEnvelope> {
        let computed = manifest_node_id(
            revision.parent1.as_ref(),
            revision.parent2.as_ref(),
            &revision.contents,
        );
        let node_id = revision.declared_node_id.unwrap_or(computed);

        let envelope = ManifestEnvelope {
            node_id,
            parent1: revision.parent1,
            parent2: revision.parent2,
            computed_node_id: computed,
            contents: Some(revision.contents),
        };
        self.put_manifest(&node_id, &envelope, revision.is_root)
            .await?;
        Ok(envelope)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a manifest. `is_root` is the caller's knowledge of the
    /// manifest's position, used when verifying.
    pub async fn get_manifest(
        &self,
        node_id: &NodeIdentity,
        is_root: bool,
    ) -> Result<Option<ManifestEnvelope>> {
        let Some(bytes) = self
            .nodes
            .get_envelope(EnvelopeKind::Manifest, node_id)
            .await?
        else {
            return Ok(None);
        };
        self.open_manifest(node_id, &bytes, is_root).map(Some)
    }

    /// Fetch a file envelope.
    ///
    /// With `verify_on_read` the content is resolved to verify the
    /// identity, so a missing blob surfaces as a retryable error.
    pub async fn get_file(&self, node_id: &NodeIdentity) -> Result<Option<FileEnvelope>> {
        let Some(bytes) = self.nodes.get_envelope(EnvelopeKind::File, node_id).await? else {
            return Ok(None);
        };
        self.open_file(node_id, &bytes).await.map(Some)
    }

    /// Fetch a file envelope together with its resolved content.
    pub async fn get_file_with_content(
        &self,
        node_id: &NodeIdentity,
    ) -> Result<Option<(FileEnvelope, Bytes)>> {
        let Some(bytes) = self.nodes.get_envelope(EnvelopeKind::File, node_id).await? else {
            return Ok(None);
        };
        let envelope = decode_file(node_id, &bytes)?;
        let content = self.resolve_content(&envelope).await?;
        if self.config.verify_on_read {
            check_file(&envelope, &content)?;
        }
        Ok(Some((envelope, content)))
    }

    /// Fetch a manifest that must be present.
    pub async fn require_manifest(
        &self,
        node_id: &NodeIdentity,
        is_root: bool,
    ) -> Result<ManifestEnvelope> {
        self.get_manifest(node_id, is_root)
            .await?
            .ok_or(EnvelopeError::NotFound {
                kind: EnvelopeKind::Manifest,
                node_id: *node_id,
            })
    }

    /// Fetch a file envelope that must be present.
    pub async fn require_file(&self, node_id: &NodeIdentity) -> Result<FileEnvelope> {
        self.get_file(node_id)
            .await?
            .ok_or(EnvelopeError::NotFound {
                kind: EnvelopeKind::File,
                node_id: *node_id,
            })
    }

    /// Fetch many manifests, each with its own root flag.
    ///
    /// Absent keys resolve to [`Lookup::Missing`]; only a corrupt or
    /// unreadable envelope fails the call. A key requested more than once
    /// is looked up once, with the root flag of its last request.
    pub async fn get_manifest_batch(
        &self,
        requests: &[(NodeIdentity, bool)],
    ) -> Result<BTreeMap<NodeIdentity, Lookup<ManifestEnvelope>>> {
        let requests: Vec<(NodeIdentity, bool)> = requests
            .iter()
            .copied()
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .collect();
        let mut results = BTreeMap::new();

        for chunk in requests.chunks(self.config.batch_chunk_size) {
            let ids: Vec<NodeIdentity> = chunk.iter().map(|(id, _)| *id).collect();
            let found = self
                .nodes
                .get_envelopes(EnvelopeKind::Manifest, &ids)
                .await?;

            for (id, is_root) in chunk {
                let lookup = match found.get(id) {
                    Some(bytes) => Lookup::Found(self.open_manifest(id, bytes, *is_root)?),
                    None => Lookup::Missing,
                };
                results.insert(*id, lookup);
            }
        }

        Ok(results)
    }

    /// Fetch many file envelopes.
    ///
    /// Absent keys resolve to [`Lookup::Missing`]. A stored envelope whose
    /// content is not present locally resolves to
    /// [`Lookup::ContentMissing`] without affecting the other keys. Only a
    /// corrupt or unreadable envelope fails the call.
    pub async fn get_file_batch(
        &self,
        node_ids: &[NodeIdentity],
    ) -> Result<BTreeMap<NodeIdentity, Lookup<FileEnvelope>>> {
        let mut node_ids = node_ids.to_vec();
        node_ids.sort_unstable();
        node_ids.dedup();
        let mut results = BTreeMap::new();

        for chunk in node_ids.chunks(self.config.batch_chunk_size) {
            let found = self.nodes.get_envelopes(EnvelopeKind::File, chunk).await?;

            for id in chunk {
                let lookup = match found.get(id) {
                    Some(bytes) => match self.open_file(id, bytes).await {
                        Ok(envelope) => Lookup::Found(envelope),
                        Err(EnvelopeError::Content(ContentError::Missing(address))) => {
                            tracing::debug!(node_id = %id, %address, "content not present locally");
                            Lookup::ContentMissing(address)
                        }
                        Err(e) => return Err(e),
                    },
                    None => Lookup::Missing,
                };
                results.insert(*id, lookup);
            }
        }

        Ok(results)
    }

    /// Whether an envelope exists, without decoding it.
    pub async fn exists(&self, kind: EnvelopeKind, node_id: &NodeIdentity) -> Result<bool> {
        Ok(self.nodes.has_envelope(kind, node_id).await?)
    }

    /// The independently derived identity of a stored manifest.
    ///
    /// For a root manifest accepted under the identity exception this is
    /// the value disaster recovery re-derives the tree from; for any other
    /// manifest it equals `node_id`.
    pub async fn recovery_identity(&self, node_id: &NodeIdentity) -> Result<Option<NodeIdentity>> {
        Ok(self
            .get_manifest(node_id, true)
            .await?
            .map(|envelope| envelope.computed_node_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn commit(
        &self,
        kind: EnvelopeKind,
        node_id: &NodeIdentity,
        bytes: &[u8],
        verification: Verification,
    ) -> Result<PutOutcome> {
        match self.nodes.insert_envelope(kind, node_id, bytes).await? {
            InsertResult::Inserted => {
                tracing::debug!(%kind, %node_id, size = bytes.len(), "committed envelope");
                Ok(PutOutcome::Stored(verification))
            }
            InsertResult::AlreadyExists => {
                tracing::debug!(%kind, %node_id, "envelope already present");
                Ok(PutOutcome::Duplicate(verification))
            }
            InsertResult::Conflict => {
                tracing::warn!(%kind, %node_id, "conflicting envelope rejected");
                Err(EnvelopeError::Conflict {
                    kind,
                    node_id: *node_id,
                })
            }
        }
    }

    fn open_manifest(
        &self,
        node_id: &NodeIdentity,
        bytes: &[u8],
        is_root: bool,
    ) -> Result<ManifestEnvelope> {
        let envelope = ManifestEnvelope::decode(bytes)?;
        check_key(node_id, &envelope.node_id)?;
        if self.config.verify_on_read {
            check_manifest(&envelope, is_root)?;
        }
        Ok(envelope)
    }

    async fn open_file(&self, node_id: &NodeIdentity, bytes: &[u8]) -> Result<FileEnvelope> {
        let envelope = decode_file(node_id, bytes)?;
        if self.config.verify_on_read {
            let content = self.resolve_content(&envelope).await?;
            check_file(&envelope, &content)?;
        }
        Ok(envelope)
    }

    async fn resolve_content(&self, envelope: &FileEnvelope) -> Result<Bytes> {
        match &envelope.content_address {
            Some(address) => Ok(self.content.get(address).await?),
            None => Ok(Bytes::new()),
        }
    }
}

fn decode_file(node_id: &NodeIdentity, bytes: &[u8]) -> Result<FileEnvelope> {
    let envelope = FileEnvelope::decode(bytes)?;
    check_key(node_id, &envelope.node_id)?;
    Ok(envelope)
}

fn check_key(key: &NodeIdentity, envelope: &NodeIdentity) -> Result<()> {
    if key != envelope {
        return Err(EnvelopeError::KeyMismatch {
            key: *key,
            envelope: *envelope,
        });
    }
    Ok(())
}

fn check_manifest(envelope: &ManifestEnvelope, is_root: bool) -> Result<Verification> {
    match verify_manifest(envelope, is_root) {
        Ok(verification) => {
            if let Verification::RootExceptionAccepted { computed } = verification {
                tracing::info!(
                    node_id = %envelope.node_id,
                    %computed,
                    "root manifest accepted under identity exception"
                );
            }
            Ok(verification)
        }
        Err(e) => {
            tracing::warn!(node_id = %envelope.node_id, error = %e, "manifest failed verification");
            Err(e.into())
        }
    }
}

fn check_file(envelope: &FileEnvelope, content: &[u8]) -> Result<Verification> {
    verify_file(envelope, content).map_err(|e| {
        tracing::warn!(node_id = %envelope.node_id, error = %e, "file failed verification");
        e.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use revstore_core::VerificationError;
    use revstore_store::{MemoryStore, SqliteStore};

    type MemoryEnvelopeStore = EnvelopeStore<MemoryStore, MemoryStore>;

    fn memory_store() -> (Arc<MemoryStore>, MemoryEnvelopeStore) {
        memory_store_with(StoreConfig::default())
    }

    fn memory_store_with(config: StoreConfig) -> (Arc<MemoryStore>, MemoryEnvelopeStore) {
        let backend = Arc::new(MemoryStore::new());
        let store = EnvelopeStore::new(backend.clone(), backend.clone(), config).unwrap();
        (backend, store)
    }

    fn manifest_envelope(contents: &'static [u8], parent1: Option<NodeIdentity>) -> ManifestEnvelope {
        let node_id = manifest_node_id(parent1.as_ref(), None, contents);
        ManifestEnvelope {
            node_id,
            parent1,
            parent2: None,
            computed_node_id: node_id,
            contents: Some(Bytes::from_static(contents)),
        }
    }

    fn hello() -> FileRevision {
        FileRevision {
            content: Bytes::from_static(b"hello\n"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_put_get_manifest() {
        let (_, store) = memory_store();
        let envelope = manifest_envelope(b"a.txt\0abc\n", None);

        let outcome = store
            .put_manifest(&envelope.node_id, &envelope, false)
            .await
            .unwrap();
        assert_eq!(outcome, PutOutcome::Stored(Verification::Consistent));

        let fetched = store
            .get_manifest(&envelope.node_id, false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, envelope);
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let (backend, store) = memory_store();
        let envelope = manifest_envelope(b"x", None);

        store
            .put_manifest(&envelope.node_id, &envelope, false)
            .await
            .unwrap();
        let again = store
            .put_manifest(&envelope.node_id, &envelope, false)
            .await
            .unwrap();
        assert!(again.is_duplicate());
        assert_eq!(backend.envelope_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_conflicting_put_rejected() {
        let (backend, store) = memory_store();
        let node_id = NodeIdentity::from_array([0x42; 20]);
        let computed = manifest_node_id(None, None, b"one");

        // Two root manifests claiming the same declared identity.
        let first = ManifestEnvelope {
            node_id,
            parent1: None,
            parent2: None,
            computed_node_id: computed,
            contents: Some(Bytes::from_static(b"one")),
        };
        store.put_manifest(&node_id, &first, true).await.unwrap();

        let second = ManifestEnvelope {
            computed_node_id: manifest_node_id(None, None, b"two"),
            contents: Some(Bytes::from_static(b"two")),
            ..first.clone()
        };
        let err = store.put_manifest(&node_id, &second, true).await.unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Conflict { kind: EnvelopeKind::Manifest, node_id: id } if id == node_id
        ));

        let kept = store.get_manifest(&node_id, true).await.unwrap().unwrap();
        assert_eq!(kept, first);
        assert_eq!(backend.envelope_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_key_mismatch() {
        let (_, store) = memory_store();
        let envelope = manifest_envelope(b"x", None);
        let other = NodeIdentity::from_array([9; 20]);

        let err = store.put_manifest(&other, &envelope, false).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::KeyMismatch { .. }));
    }

    #[tokio::test]
    async fn test_failed_verification_commits_nothing() {
        let (backend, store) = memory_store();
        let mut envelope = manifest_envelope(b"x", None);
        envelope.contents = Some(Bytes::from_static(b"y"));

        let err = store
            .put_manifest(&envelope.node_id, &envelope, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Verification(VerificationError::HashMismatch { .. })
        ));
        assert!(!store
            .exists(EnvelopeKind::Manifest, &envelope.node_id)
            .await
            .unwrap());
        assert_eq!(backend.envelope_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_root_exception_roundtrip() {
        let (_, store) = memory_store();
        let declared = NodeIdentity::from_array([0xee; 20]);

        let envelope = store
            .ingest_manifest(ManifestRevision {
                contents: Bytes::from_static(b"root listing"),
                declared_node_id: Some(declared),
                is_root: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(envelope.node_id, declared);
        assert!(envelope.has_identity_exception());

        let fetched = store.get_manifest(&declared, true).await.unwrap().unwrap();
        assert_eq!(fetched, envelope);

        // Outside the root position the same envelope is corrupt.
        let err = store.get_manifest(&declared, false).await.unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Verification(VerificationError::HashMismatch { .. })
        ));

        let recovered = store.recovery_identity(&declared).await.unwrap();
        assert_eq!(
            recovered,
            Some(manifest_node_id(None, None, b"root listing"))
        );
    }

    #[tokio::test]
    async fn test_declared_mismatch_rejected_off_root() {
        let (_, store) = memory_store();
        let err = store
            .ingest_manifest(ManifestRevision {
                contents: Bytes::from_static(b"listing"),
                declared_node_id: Some(NodeIdentity::from_array([1; 20])),
                is_root: false,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Verification(VerificationError::HashMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_hello_file() {
        let (_, store) = memory_store();
        let envelope = store.ingest_file(hello()).await.unwrap();
        assert_eq!(envelope.content_size, 6);
        assert_eq!(envelope.metadata, None);

        let (fetched, content) = store
            .get_file_with_content(&envelope.node_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, envelope);
        assert_eq!(&content[..], b"hello\n");

        let address = fetched.content_address.unwrap();
        assert_eq!(&store.content().get(&address).await.unwrap()[..], b"hello\n");
    }

    #[tokio::test]
    async fn test_size_excludes_metadata() {
        let (_, store) = memory_store();
        let envelope = store
            .ingest_file(FileRevision {
                content: Bytes::from_static(b"abcdef"),
                metadata: Some(Bytes::from_static(b"\x01\n\x01\n")),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(envelope.content_size, 6);
        assert_eq!(envelope.metadata_bytes().len(), 4);
    }

    #[tokio::test]
    async fn test_marker_content_gets_empty_header() {
        let (_, store) = memory_store();
        let envelope = store
            .ingest_file(FileRevision {
                content: Bytes::from_static(b"\x01\nnot a header"),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(envelope.metadata.as_deref(), Some(EMPTY_HEADER));
    }

    #[tokio::test]
    async fn test_malformed_metadata_rejected() {
        let (backend, store) = memory_store();
        let err = store
            .ingest_file(FileRevision {
                content: Bytes::from_static(b"body"),
                metadata: Some(Bytes::from_static(b"copy: a\n")),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Metadata(_)));
        assert_eq!(backend.blob_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_identical_content_deduplicated() {
        let (backend, store) = memory_store();
        let a = store.ingest_file(hello()).await.unwrap();
        let b = store
            .ingest_file(FileRevision {
                parent1: Some(a.node_id),
                ..hello()
            })
            .await
            .unwrap();

        assert_ne!(a.node_id, b.node_id);
        assert_eq!(a.content_address, b.content_address);
        assert_eq!(backend.blob_count().unwrap(), 1);
        assert_eq!(backend.envelope_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_content_is_retryable() {
        let nodes = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryStore::new());
        let writer =
            EnvelopeStore::new(nodes.clone(), blobs.clone(), StoreConfig::default()).unwrap();
        let envelope = writer.ingest_file(hello()).await.unwrap();

        // Same envelopes, but a blob store that has none of the content.
        let sparse =
            EnvelopeStore::new(nodes, Arc::new(MemoryStore::new()), StoreConfig::default())
                .unwrap();
        let err = sparse.get_file(&envelope.node_id).await.unwrap_err();
        assert!(err.is_retryable());

        // The envelope itself is still there.
        assert!(sparse
            .exists(EnvelopeKind::File, &envelope.node_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_put_file_without_content_needs_zero_size() {
        let (_, store) = memory_store();
        let empty = FileEnvelope {
            node_id: file_node_id(None, None, None, b""),
            parent1: None,
            parent2: None,
            content_address: None,
            content_size: 0,
            metadata: None,
        };
        store.put_file(&empty.node_id, &empty).await.unwrap();

        let sized = FileEnvelope {
            content_size: 6,
            ..empty.clone()
        };
        let err = store.put_file(&sized.node_id, &sized).await.unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Verification(VerificationError::HashMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_put_file_with_unknown_content() {
        let (_, store) = memory_store();
        let envelope = FileEnvelope {
            node_id: file_node_id(None, None, None, b"elsewhere"),
            parent1: None,
            parent2: None,
            content_address: Some(ContentAddress::compute(b"elsewhere")),
            content_size: 9,
            metadata: None,
        };
        let err = store.put_file(&envelope.node_id, &envelope).await.unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Content(ContentError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_blob_surfaces_on_read() {
        let (backend, store) = memory_store();
        let envelope = store.ingest_file(hello()).await.unwrap();
        let address = envelope.content_address.unwrap();
        backend
            .corrupt_blob(&address, Bytes::from_static(b"jello\n"))
            .unwrap();

        let err = store.get_file(&envelope.node_id).await.unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Content(ContentError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_corruption_passes_through_unverified_blobs() {
        let config = StoreConfig {
            verify_blobs: false,
            ..Default::default()
        };
        let (backend, store) = memory_store_with(config);
        let envelope = store.ingest_file(hello()).await.unwrap();
        backend
            .corrupt_blob(
                &envelope.content_address.unwrap(),
                Bytes::from_static(b"jello\n"),
            )
            .unwrap();

        // Still caught by the identity check.
        let err = store.get_file(&envelope.node_id).await.unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Verification(VerificationError::HashMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_verify_on_read_disabled() {
        let config = StoreConfig {
            verify_on_read: false,
            ..Default::default()
        };
        let (_, store) = memory_store_with(config);
        let envelope = store
            .ingest_manifest(ManifestRevision {
                contents: Bytes::from_static(b"root"),
                declared_node_id: Some(NodeIdentity::from_array([3; 20])),
                is_root: true,
                ..Default::default()
            })
            .await
            .unwrap();

        // Would fail verification in a non-root position.
        assert!(store
            .get_manifest(&envelope.node_id, false)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_stored_envelope_under_wrong_key() {
        let (backend, store) = memory_store();
        let envelope = manifest_envelope(b"x", None);
        let wrong_key = NodeIdentity::from_array([7; 20]);
        backend
            .corrupt_envelope(
                EnvelopeKind::Manifest,
                &wrong_key,
                Bytes::from(envelope.encode()),
            )
            .unwrap();

        let err = store.get_manifest(&wrong_key, false).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::KeyMismatch { .. }));
    }

    #[tokio::test]
    async fn test_undecodable_envelope() {
        let (backend, store) = memory_store();
        let node_id = NodeIdentity::from_array([5; 20]);
        backend
            .corrupt_envelope(EnvelopeKind::File, &node_id, Bytes::from_static(b"\xa0"))
            .unwrap();

        let err = store.get_file(&node_id).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_batch_partiality() {
        let (_, store) = memory_store();
        let a = store.ingest_file(hello()).await.unwrap();
        let c = store
            .ingest_file(FileRevision {
                content: Bytes::from_static(b"c"),
                ..Default::default()
            })
            .await
            .unwrap();
        let b = file_node_id(None, None, None, b"never stored");

        let results = store
            .get_file_batch(&[a.node_id, b, c.node_id])
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[&a.node_id], Lookup::Found(a.clone()));
        assert!(results[&b].is_missing());
        assert_eq!(results[&c.node_id].found(), Some(&c));
    }

    #[tokio::test]
    async fn test_file_batch_sparse_content() {
        let nodes = Arc::new(MemoryStore::new());
        let local = Arc::new(MemoryStore::new());
        let store =
            EnvelopeStore::new(nodes.clone(), local.clone(), StoreConfig::default()).unwrap();
        let a = store.ingest_file(hello()).await.unwrap();

        // B's envelope lands in the shared node store, its blob elsewhere.
        let elsewhere =
            EnvelopeStore::new(nodes, Arc::new(MemoryStore::new()), StoreConfig::default())
                .unwrap();
        let b = elsewhere
            .ingest_file(FileRevision {
                content: Bytes::from_static(b"not fetched yet"),
                ..Default::default()
            })
            .await
            .unwrap();
        let c = file_node_id(None, None, None, b"never stored");

        let results = store
            .get_file_batch(&[a.node_id, b.node_id, c])
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[&a.node_id], Lookup::Found(a.clone()));
        assert_eq!(
            results[&b.node_id],
            Lookup::ContentMissing(b.content_address.unwrap())
        );
        assert_eq!(results[&b.node_id].found(), None);
        assert!(results[&c].is_missing());
    }

    #[tokio::test]
    async fn test_file_batch_corruption_fails_whole_call() {
        let (backend, store) = memory_store();
        let a = store.ingest_file(hello()).await.unwrap();
        backend
            .corrupt_blob(
                &a.content_address.unwrap(),
                Bytes::from_static(b"jello\n"),
            )
            .unwrap();

        let err = store
            .get_file_batch(&[a.node_id, NodeIdentity::from_array([4; 20])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Content(ContentError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_manifest_batch_duplicate_keys_use_last_flag() {
        let (_, store) = memory_store();
        let root = store
            .ingest_manifest(ManifestRevision {
                contents: Bytes::from_static(b"root listing"),
                declared_node_id: Some(NodeIdentity::from_array([0xab; 20])),
                is_root: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let id = root.node_id;

        let results = store
            .get_manifest_batch(&[(id, false), (id, true)])
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[&id], Lookup::Found(root));

        let err = store
            .get_manifest_batch(&[(id, true), (id, false)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Verification(VerificationError::HashMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_manifest_batch_spans_chunks() {
        let config = StoreConfig {
            batch_chunk_size: 2,
            ..Default::default()
        };
        let (_, store) = memory_store_with(config);

        let mut requests = Vec::new();
        let mut parent = None;
        for i in 0..5u8 {
            let envelope = store
                .ingest_manifest(ManifestRevision {
                    parent1: parent,
                    contents: Bytes::from(vec![i; 8]),
                    ..Default::default()
                })
                .await
                .unwrap();
            parent = Some(envelope.node_id);
            requests.push((envelope.node_id, false));
        }
        let absent = NodeIdentity::from_array([0xfe; 20]);
        requests.push((absent, false));

        let results = store.get_manifest_batch(&requests).await.unwrap();
        assert_eq!(results.len(), 6);
        assert_eq!(results.values().filter(|l| l.is_missing()).count(), 1);
        assert!(results[&absent].is_missing());
    }

    #[tokio::test]
    async fn test_require_reports_not_found() {
        let (_, store) = memory_store();
        let id = NodeIdentity::from_array([8; 20]);
        assert!(matches!(
            store.require_file(&id).await,
            Err(EnvelopeError::NotFound { kind: EnvelopeKind::File, .. })
        ));
        assert!(matches!(
            store.require_manifest(&id, false).await,
            Err(EnvelopeError::NotFound { kind: EnvelopeKind::Manifest, .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let backend = Arc::new(MemoryStore::new());
        let config = StoreConfig {
            batch_chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            EnvelopeStore::new(backend.clone(), backend, config),
            Err(EnvelopeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_sqlite_backend() {
        let backend = Arc::new(SqliteStore::open_memory().unwrap());
        let store =
            EnvelopeStore::new(backend.clone(), backend, StoreConfig::default()).unwrap();

        let file = store.ingest_file(hello()).await.unwrap();
        let manifest = store
            .ingest_manifest(ManifestRevision {
                contents: Bytes::from(format!("a.txt\0{}\n", file.node_id)),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            store.get_file(&file.node_id).await.unwrap(),
            Some(file.clone())
        );
        assert_eq!(
            store.get_manifest(&manifest.node_id, false).await.unwrap(),
            Some(manifest)
        );
        assert!(!store
            .exists(EnvelopeKind::Manifest, &file.node_id)
            .await
            .unwrap());
    }
}
