//! # Revstore Core
//!
//! Pure primitives for revstore: the two hash domains, the envelope record
//! format and the identity verifier.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`NodeIdentity`] - Historical identity of a revision (SHA-1, 20 bytes)
//! - [`ContentAddress`] - Physical address of raw bytes (Blake3, 32 bytes)
//! - [`ManifestEnvelope`] / [`FileEnvelope`] - The stored revision records
//! - [`Verification`] - Outcome of reconciling stored and recomputed identity
//!
//! ## Encoding
//!
//! Envelopes are encoded as deterministic CBOR maps. See [`codec`].

pub mod codec;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod metadata;
pub mod types;
pub mod verify;

pub use envelope::{Envelope, EnvelopeKind, FileEnvelope, ManifestEnvelope};
pub use error::{DecodeError, MalformedHash, MetadataError, VerificationError};
pub use hash::{file_node_id, manifest_node_id};
pub use metadata::{CopyFrom, FileMetadata};
pub use types::{ContentAddress, NodeIdentity};
pub use verify::{verify_file, verify_manifest, Verification};
