//! Envelope records: the stored form of manifest and file revisions.
//!
//! An envelope carries a revision's historical identity, its parent edges
//! and either inline content (manifests) or a reference into the content
//! store (files). Envelopes are immutable once written.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec;
use crate::error::DecodeError;
use crate::types::{ContentAddress, NodeIdentity};

/// The two node identity sub-domains. Each gets its own keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EnvelopeKind {
    Manifest = 1,
    File = 2,
}

impl EnvelopeKind {
    /// Convert to u8 for persistence.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Manifest),
            2 => Some(Self::File),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::File => "file",
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One directory-tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEnvelope {
    /// Historical identity of this snapshot.
    pub node_id: NodeIdentity,

    /// First parent manifest (None at a lineage root).
    pub parent1: Option<NodeIdentity>,

    /// Second parent manifest (merges only).
    pub parent2: Option<NodeIdentity>,

    /// Identity recomputed from `contents`. Always present; differs from
    /// `node_id` only for the root manifest of a snapshot tree.
    pub computed_node_id: NodeIdentity,

    /// Serialized directory listing, stored inline.
    pub contents: Option<Bytes>,
}

impl ManifestEnvelope {
    /// Encode to canonical bytes.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode_manifest(self)
    }

    /// Decode from bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        codec::decode_manifest(bytes)
    }

    /// The present parents, in p1, p2 order.
    pub fn parents(&self) -> impl Iterator<Item = NodeIdentity> + '_ {
        self.parent1.iter().chain(self.parent2.iter()).copied()
    }

    /// Contents as a slice; absent contents read as empty.
    pub fn contents_bytes(&self) -> &[u8] {
        self.contents.as_deref().unwrap_or_default()
    }

    /// Whether the declared identity departs from the computed one.
    pub fn has_identity_exception(&self) -> bool {
        self.node_id != self.computed_node_id
    }
}

/// One file revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEnvelope {
    pub node_id: NodeIdentity,
    pub parent1: Option<NodeIdentity>,
    pub parent2: Option<NodeIdentity>,

    /// Reference into the content store. None means no content was stored;
    /// it does not by itself imply `content_size == 0`.
    pub content_address: Option<ContentAddress>,

    /// Length of the raw content, excluding `metadata`.
    pub content_size: u64,

    /// Metadata header (copy/rename provenance), framed by `\x01\n` markers.
    pub metadata: Option<Bytes>,
}

impl FileEnvelope {
    /// Encode to canonical bytes.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode_file(self)
    }

    /// Decode from bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        codec::decode_file(bytes)
    }

    /// The present parents, in p1, p2 order.
    pub fn parents(&self) -> impl Iterator<Item = NodeIdentity> + '_ {
        self.parent1.iter().chain(self.parent2.iter()).copied()
    }

    /// Metadata as a slice; absent metadata reads as empty.
    pub fn metadata_bytes(&self) -> &[u8] {
        self.metadata.as_deref().unwrap_or_default()
    }
}

/// Either kind of envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Envelope {
    Manifest(ManifestEnvelope),
    File(FileEnvelope),
}

impl Envelope {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Manifest(_) => EnvelopeKind::Manifest,
            Self::File(_) => EnvelopeKind::File,
        }
    }

    pub fn node_id(&self) -> NodeIdentity {
        match self {
            Self::Manifest(m) => m.node_id,
            Self::File(f) => f.node_id,
        }
    }

    /// Encode to canonical bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Manifest(m) => codec::encode_manifest(m),
            Self::File(f) => codec::encode_file(f),
        }
    }

    /// Decode bytes known to hold an envelope of `kind`.
    pub fn decode(kind: EnvelopeKind, bytes: &[u8]) -> Result<Self, DecodeError> {
        match kind {
            EnvelopeKind::Manifest => codec::decode_manifest(bytes).map(Self::Manifest),
            EnvelopeKind::File => codec::decode_file(bytes).map(Self::File),
        }
    }
}

impl From<ManifestEnvelope> for Envelope {
    fn from(m: ManifestEnvelope) -> Self {
        Self::Manifest(m)
    }
}

impl From<FileEnvelope> for Envelope {
    fn from(f: FileEnvelope) -> Self {
        Self::File(f)
    }
}
