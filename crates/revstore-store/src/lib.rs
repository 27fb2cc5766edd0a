//! # Revstore Store
//!
//! Storage abstraction for revstore. Provides trait-based interfaces for
//! envelope persistence and content blobs, with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`NodeStore`] - Append-only envelope persistence, one keyspace per kind
//! - [`BlobStore`] - The content-addressed blob store
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`ContentAdapter`] - Address-computing access to a blob store
//! - [`ReplicatedBlobStore`] - Local blob store with remote fallback
//!
//! ## Usage
//!
//! ```rust,no_run
//! use revstore_core::{EnvelopeKind, NodeIdentity};
//! use revstore_store::{InsertResult, NodeStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("revstore.db").unwrap();
//!
//!     let id = NodeIdentity::from_array([0x11; 20]);
//!     let result = store
//!         .insert_envelope(EnvelopeKind::File, &id, b"encoded envelope")
//!         .await
//!         .unwrap();
//!     assert_eq!(result, InsertResult::Inserted);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: inserting identical bytes twice returns `AlreadyExists`
//! - **Conflict detection**: different bytes under an existing key return `Conflict`
//! - **No interpretation**: this crate stores bytes; decoding and
//!   verification live in `revstore`

pub mod adapter;
pub mod error;
pub mod memory;
pub mod migration;
pub mod replicated;
pub mod sqlite;
pub mod traits;

pub use adapter::ContentAdapter;
pub use error::{ContentError, Result, StoreError};
pub use memory::MemoryStore;
pub use replicated::ReplicatedBlobStore;
pub use sqlite::SqliteStore;
pub use traits::{BlobStore, InsertResult, NodeStore};
