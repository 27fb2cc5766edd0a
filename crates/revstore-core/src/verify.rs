//! Identity verification: reconcile a stored `node_id` with the identity
//! recomputed from the envelope's content-bearing fields.
//!
//! The verifier is a pure function of the decoded envelope, the resolved
//! content (files only) and the caller-supplied root flag. It never looks
//! at DAG topology itself.

use crate::envelope::{FileEnvelope, ManifestEnvelope};
use crate::error::VerificationError;
use crate::hash::{file_node_id, manifest_node_id};
use crate::types::NodeIdentity;

/// Successful verification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The recomputed identity equals `node_id`.
    Consistent,
    /// A root manifest whose `node_id` legitimately differs from its
    /// content hash. `computed` is the value disaster recovery can re-derive.
    RootExceptionAccepted { computed: NodeIdentity },
}

impl Verification {
    pub fn is_root_exception(&self) -> bool {
        matches!(self, Self::RootExceptionAccepted { .. })
    }
}

/// Verify a manifest envelope.
///
/// `is_root` says whether the manifest occupies the root position of its
/// snapshot tree; only then may `node_id` differ from the recomputed hash.
/// The stored `computed_node_id` must equal the recomputed hash in every
/// case.
pub fn verify_manifest(
    envelope: &ManifestEnvelope,
    is_root: bool,
) -> Result<Verification, VerificationError> {
    let computed = manifest_node_id(
        envelope.parent1.as_ref(),
        envelope.parent2.as_ref(),
        envelope.contents_bytes(),
    );

    if computed != envelope.node_id && !is_root {
        return Err(VerificationError::HashMismatch {
            node_id: envelope.node_id,
            computed,
        });
    }

    if envelope.computed_node_id != computed {
        return Err(VerificationError::ComputedIdInconsistent {
            node_id: envelope.node_id,
            stored: envelope.computed_node_id,
            computed,
        });
    }

    if computed == envelope.node_id {
        Ok(Verification::Consistent)
    } else {
        Ok(Verification::RootExceptionAccepted { computed })
    }
}

/// Verify a file envelope against its resolved content.
///
/// `content` is the raw content (metadata excluded); pass an empty slice
/// for a content-less revision. `content_size` is a content-bearing field,
/// so a size that disagrees with the content is a hash mismatch too.
/// Files have no root exception.
pub fn verify_file(
    envelope: &FileEnvelope,
    content: &[u8],
) -> Result<Verification, VerificationError> {
    let computed = file_node_id(
        envelope.parent1.as_ref(),
        envelope.parent2.as_ref(),
        envelope.metadata.as_deref(),
        content,
    );

    if computed != envelope.node_id || content.len() as u64 != envelope.content_size {
        return Err(VerificationError::HashMismatch {
            node_id: envelope.node_id,
            computed,
        });
    }

    Ok(Verification::Consistent)
}
