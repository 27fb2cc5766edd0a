//! The historical node hashing rule.
//!
//! `node = sha1(min(p1, p2) || max(p1, p2) || data)`, with an absent parent
//! hashed as twenty zero bytes. The zero node never leaves this module;
//! everywhere else an absent parent is `None`.

use sha1::{Digest, Sha1};

use crate::types::NodeIdentity;

const NULL_NODE: [u8; 20] = [0u8; 20];

/// Hash `data` under the given parents.
///
/// `data` is fed as a sequence of chunks so callers can hash
/// `metadata || content` without concatenating.
pub fn node_hash(
    parent1: Option<&NodeIdentity>,
    parent2: Option<&NodeIdentity>,
    data: &[&[u8]],
) -> NodeIdentity {
    let p1 = parent1.map_or(&NULL_NODE, |p| p.as_bytes());
    let p2 = parent2.map_or(&NULL_NODE, |p| p.as_bytes());
    let (first, second) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };

    let mut hasher = Sha1::new();
    hasher.update(first);
    hasher.update(second);
    for chunk in data {
        hasher.update(chunk);
    }

    let digest = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    NodeIdentity::from_array(out)
}

/// Identity of a manifest with the given parents and contents.
pub fn manifest_node_id(
    parent1: Option<&NodeIdentity>,
    parent2: Option<&NodeIdentity>,
    contents: &[u8],
) -> NodeIdentity {
    node_hash(parent1, parent2, &[contents])
}

/// Identity of a file revision. Metadata is hashed ahead of the content.
pub fn file_node_id(
    parent1: Option<&NodeIdentity>,
    parent2: Option<&NodeIdentity>,
    metadata: Option<&[u8]>,
    content: &[u8],
) -> NodeIdentity {
    node_hash(parent1, parent2, &[metadata.unwrap_or_default(), content])
}
