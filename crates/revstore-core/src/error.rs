//! Error types for revstore core.

use thiserror::Error;

use crate::types::NodeIdentity;

/// A hash constructor was given a byte sequence of the wrong width.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {domain}: expected {expected} bytes, got {actual}")]
pub struct MalformedHash {
    pub domain: &'static str,
    pub expected: usize,
    pub actual: usize,
}

/// Errors produced while decoding an envelope record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("truncated envelope: {0} bytes is too short")]
    Truncated(usize),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("field {field}: {source}")]
    MalformedHash {
        field: &'static str,
        #[source]
        source: MalformedHash,
    },

    #[error("malformed envelope: {0}")]
    Malformed(String),
}

/// Identity reconciliation failures. Every variant indicates corruption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("hash mismatch for {node_id}: recomputed {computed}")]
    HashMismatch {
        node_id: NodeIdentity,
        computed: NodeIdentity,
    },

    #[error("stored computed_node_id {stored} for {node_id} disagrees with recomputed {computed}")]
    ComputedIdInconsistent {
        node_id: NodeIdentity,
        stored: NodeIdentity,
        computed: NodeIdentity,
    },
}

/// Errors parsing a file metadata header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("metadata header must start with \\x01\\n")]
    MissingOpenMarker,

    #[error("metadata header is not terminated by \\x01\\n")]
    MissingCloseMarker,

    #[error("invalid metadata line: {0:?}")]
    InvalidLine(String),
}
