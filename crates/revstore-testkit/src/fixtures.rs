//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. Helpers panic on failure;
//! they are meant for test bodies only.

use std::sync::Arc;

use bytes::Bytes;
use revstore::{
    EnvelopeStore, FileEnvelope, FileRevision, ManifestEnvelope, ManifestRevision, StoreConfig,
};
use revstore_core::{manifest_node_id, CopyFrom, FileMetadata, NodeIdentity};
use revstore_store::MemoryStore;

/// An envelope store over a single in-memory backend.
pub struct TestFixture {
    /// Holds both the envelopes and the content blobs.
    pub backend: Arc<MemoryStore>,
    pub store: EnvelopeStore<MemoryStore, MemoryStore>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let backend = Arc::new(MemoryStore::new());
        let store = EnvelopeStore::new(backend.clone(), backend.clone(), config)
            .expect("fixture config is valid");
        Self { backend, store }
    }

    /// Ingest a file revision with a single optional parent.
    pub async fn file(&self, parent: Option<NodeIdentity>, content: &[u8]) -> FileEnvelope {
        self.store
            .ingest_file(FileRevision {
                parent1: parent,
                content: Bytes::copy_from_slice(content),
                ..Default::default()
            })
            .await
            .expect("file ingest")
    }

    /// Ingest a file revision recorded as a copy of `source`.
    pub async fn copied_file(&self, source: &CopyFrom, content: &[u8]) -> FileEnvelope {
        self.store
            .ingest_file(FileRevision {
                parent1: Some(source.node),
                content: Bytes::copy_from_slice(content),
                metadata: Some(FileMetadata::copied_from(source).encode()),
                ..Default::default()
            })
            .await
            .expect("copied file ingest")
    }

    /// Ingest a linear history of a single file, oldest first.
    pub async fn file_history(&self, contents: &[&[u8]]) -> Vec<FileEnvelope> {
        let mut history: Vec<FileEnvelope> = Vec::with_capacity(contents.len());
        for content in contents {
            let parent = history.last().map(|f| f.node_id);
            history.push(self.file(parent, content).await);
        }
        history
    }

    /// Ingest a non-root manifest whose identity is its content hash.
    pub async fn manifest(
        &self,
        parent: Option<NodeIdentity>,
        entries: &[(&str, NodeIdentity)],
    ) -> ManifestEnvelope {
        self.store
            .ingest_manifest(ManifestRevision {
                parent1: parent,
                contents: manifest_contents(entries),
                ..Default::default()
            })
            .await
            .expect("manifest ingest")
    }

    /// Ingest a root manifest under a declared identity.
    pub async fn root_manifest(
        &self,
        declared: NodeIdentity,
        entries: &[(&str, NodeIdentity)],
    ) -> ManifestEnvelope {
        self.store
            .ingest_manifest(ManifestRevision {
                contents: manifest_contents(entries),
                declared_node_id: Some(declared),
                is_root: true,
                ..Default::default()
            })
            .await
            .expect("root manifest ingest")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a flat directory listing: `path \0 hex-node \n` per entry.
pub fn manifest_contents(entries: &[(&str, NodeIdentity)]) -> Bytes {
    let mut out = Vec::new();
    for (path, node) in entries {
        out.extend_from_slice(path.as_bytes());
        out.push(0);
        out.extend_from_slice(node.to_hex().as_bytes());
        out.push(b'\n');
    }
    Bytes::from(out)
}

/// A consistent manifest envelope built without a store.
pub fn manifest_envelope(
    parent1: Option<NodeIdentity>,
    parent2: Option<NodeIdentity>,
    contents: Bytes,
) -> ManifestEnvelope {
    let node_id = manifest_node_id(parent1.as_ref(), parent2.as_ref(), &contents);
    ManifestEnvelope {
        node_id,
        parent1,
        parent2,
        computed_node_id: node_id,
        contents: Some(contents),
    }
}
