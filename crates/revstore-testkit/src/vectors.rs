//! Golden test vectors for node identities.
//!
//! Every implementation of the historical hashing rule must reproduce
//! these identities exactly. Parents are given as hex so the vectors can
//! be exported and checked elsewhere.

use revstore_core::{file_node_id, manifest_node_id, EnvelopeKind, NodeIdentity};
use serde::Serialize;

/// A golden test vector.
#[derive(Debug, Clone, Serialize)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub kind: EnvelopeKind,
    /// First parent (hex).
    pub parent1: Option<&'static str>,
    /// Second parent (hex).
    pub parent2: Option<&'static str>,
    /// File metadata header. Always empty for manifests.
    #[serde(serialize_with = "as_hex")]
    pub metadata: &'static [u8],
    /// File content or manifest contents.
    #[serde(serialize_with = "as_hex")]
    pub data: &'static [u8],
    /// Expected node identity (hex).
    pub expected_node_id: &'static str,
}

fn as_hex<S: serde::Serializer>(bytes: &&'static [u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

pub const HELLO_FILE: &str = "2c186c8c5bc0df5af5b951afe407d803f9e6b8c9";
pub const EMPTY_FILE: &str = "b80de5d138758541c5f05265ad144ab9fa86d1db";
pub const CHILD_FILE: &str = "faa62ea5d798c6624f63d25f2e64f1c107815f20";
pub const COPIED_FILE: &str = "e4a18a95ad20ea29875889f81cd7458c58d809e8";
pub const ROOT_MANIFEST: &str = "12a740b79149c7c4c9d8d90d0dc06746e2bdcf80";
pub const CHILD_MANIFEST: &str = "3006e93cfc3d789805f10de06361add993d692dd";
pub const MERGE_MANIFEST: &str = "97866bc5eb5690bd5ffe48fc6bff637a68910db2";

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "root file with hello content",
            kind: EnvelopeKind::File,
            parent1: None,
            parent2: None,
            metadata: b"",
            data: b"hello\n",
            expected_node_id: HELLO_FILE,
        },
        GoldenVector {
            name: "empty root file",
            kind: EnvelopeKind::File,
            parent1: None,
            parent2: None,
            metadata: b"",
            data: b"",
            expected_node_id: EMPTY_FILE,
        },
        GoldenVector {
            name: "file modified on top of hello",
            kind: EnvelopeKind::File,
            parent1: Some(HELLO_FILE),
            parent2: None,
            metadata: b"",
            data: b"hello world\n",
            expected_node_id: CHILD_FILE,
        },
        GoldenVector {
            name: "file copied from a.txt",
            kind: EnvelopeKind::File,
            parent1: Some(HELLO_FILE),
            parent2: None,
            metadata: b"\x01\ncopy: a.txt\ncopyrev: 2c186c8c5bc0df5af5b951afe407d803f9e6b8c9\n\x01\n",
            data: b"hello\n",
            expected_node_id: COPIED_FILE,
        },
        GoldenVector {
            name: "root manifest listing a.txt",
            kind: EnvelopeKind::Manifest,
            parent1: None,
            parent2: None,
            metadata: b"",
            data: b"a.txt\x002c186c8c5bc0df5af5b951afe407d803f9e6b8c9\n",
            expected_node_id: ROOT_MANIFEST,
        },
        GoldenVector {
            name: "manifest after modifying a.txt",
            kind: EnvelopeKind::Manifest,
            parent1: Some(ROOT_MANIFEST),
            parent2: None,
            metadata: b"",
            data: b"a.txt\x00faa62ea5d798c6624f63d25f2e64f1c107815f20\n",
            expected_node_id: CHILD_MANIFEST,
        },
        GoldenVector {
            name: "merge manifest, parents out of order",
            kind: EnvelopeKind::Manifest,
            parent1: Some(CHILD_MANIFEST),
            parent2: Some(ROOT_MANIFEST),
            metadata: b"",
            data: b"a.txt\x002c186c8c5bc0df5af5b951afe407d803f9e6b8c9\nb.txt\x00faa62ea5d798c6624f63d25f2e64f1c107815f20\n",
            expected_node_id: MERGE_MANIFEST,
        },
    ]
}

fn parse_parent(hex: Option<&str>) -> Option<NodeIdentity> {
    hex.map(|h| NodeIdentity::from_hex(h).expect("golden parent is valid hex"))
}

/// Compute the node identity a vector describes.
pub fn compute_node_id(vector: &GoldenVector) -> NodeIdentity {
    let p1 = parse_parent(vector.parent1);
    let p2 = parse_parent(vector.parent2);
    match vector.kind {
        EnvelopeKind::File => {
            let metadata = (!vector.metadata.is_empty()).then_some(vector.metadata);
            file_node_id(p1.as_ref(), p2.as_ref(), metadata, vector.data)
        }
        EnvelopeKind::Manifest => manifest_node_id(p1.as_ref(), p2.as_ref(), vector.data),
    }
}

/// Check every vector, returning `(name, matches, computed_hex)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let hex = compute_node_id(v).to_hex();
            (v.name.to_string(), hex == v.expected_node_id, hex)
        })
        .collect()
}

/// All vectors as pretty-printed JSON.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&all_vectors())
}
