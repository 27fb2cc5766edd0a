//! # Revstore
//!
//! Verified, append-only storage for version-control revision envelopes.
//!
//! ## Overview
//!
//! Each revision is stored as an envelope keyed by its historical node
//! identity (SHA-1 over the sorted parents and the content). File content
//! lives separately in a content-addressed blob store, keyed by Blake3.
//! The two hash domains are distinct types and never interchange.
//!
//! Every write is verified before it commits; reads verify before they
//! return. A root manifest may carry a declared identity that differs from
//! its content hash. It is accepted when the caller says the manifest sits
//! at the root of its snapshot tree, and the computed identity is kept for
//! disaster recovery.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use revstore::backend::SqliteStore;
//! use revstore::{EnvelopeStore, FileRevision, StoreConfig};
//!
//! async fn example() {
//!     let backend = Arc::new(SqliteStore::open("revstore.db").unwrap());
//!     let store = EnvelopeStore::new(backend.clone(), backend, StoreConfig::default()).unwrap();
//!
//!     let envelope = store
//!         .ingest_file(FileRevision {
//!             content: Bytes::from_static(b"hello\n"),
//!             ..Default::default()
//!         })
//!         .await
//!         .unwrap();
//!
//!     let fetched = store.get_file(&envelope.node_id).await.unwrap();
//!     assert_eq!(fetched, Some(envelope));
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `revstore::core` - hash types, envelope codec and verifier
//! - `revstore::backend` - storage traits, backends and the content adapter

pub mod config;
pub mod error;
pub mod store;

pub use revstore_core as core;
pub use revstore_store as backend;

pub use config::StoreConfig;
pub use error::{EnvelopeError, Result};
pub use store::{EnvelopeStore, FileRevision, Lookup, ManifestRevision, PutOutcome};

pub use revstore_core::{
    ContentAddress, Envelope, EnvelopeKind, FileEnvelope, ManifestEnvelope, NodeIdentity,
    Verification,
};
