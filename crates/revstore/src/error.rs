//! Error types for the envelope store.

use revstore_core::{
    DecodeError, EnvelopeKind, MalformedHash, MetadataError, NodeIdentity, VerificationError,
};
use revstore_store::{ContentError, StoreError};
use thiserror::Error;

/// Errors that can occur during envelope store operations.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Stored or supplied bytes are not a valid envelope.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Recomputed identity disagrees with the envelope. Indicates corruption.
    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// Content could not be resolved.
    #[error("content error: {0}")]
    Content(#[from] ContentError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Malformed file metadata header.
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    MalformedHash(#[from] MalformedHash),

    /// Different envelope bytes are already committed under this key.
    #[error("conflicting {kind} envelope for {node_id}")]
    Conflict {
        kind: EnvelopeKind,
        node_id: NodeIdentity,
    },

    /// The key an envelope is stored or requested under is not its own node_id.
    #[error("key {key} does not match envelope node_id {envelope}")]
    KeyMismatch {
        key: NodeIdentity,
        envelope: NodeIdentity,
    },

    /// A required envelope is absent.
    #[error("{kind} envelope not found: {node_id}")]
    NotFound {
        kind: EnvelopeKind,
        node_id: NodeIdentity,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EnvelopeError {
    /// Whether retrying against another source may succeed.
    ///
    /// Only a missing content blob qualifies; everything else is terminal
    /// for the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Content(e) if e.is_retryable())
    }
}

/// Result type for envelope store operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
