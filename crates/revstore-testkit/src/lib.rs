//! # Revstore Testkit
//!
//! Testing utilities for revstore.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known node identities for cross-implementation checks
//! - **Generators**: Proptest strategies for envelopes and revisions
//! - **Fixtures**: An in-memory envelope store with ingestion helpers
//!
//! ## Golden Vectors
//!
//! ```rust
//! use revstore_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, hex) in verify_all_vectors() {
//!     assert!(matches, "{}: {}", name, hex);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use revstore_testkit::generators::{manifest_from_params, ManifestParams};
//!
//! proptest! {
//!     #[test]
//!     fn encoding_is_deterministic(params: ManifestParams) {
//!         let envelope = manifest_from_params(&params);
//!         prop_assert_eq!(envelope.encode(), envelope.encode());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{manifest_contents, manifest_envelope, TestFixture};
pub use generators::{file_from_params, manifest_from_params, FileParams, ManifestParams};
pub use vectors::{all_vectors, compute_node_id, verify_all_vectors, GoldenVector};
