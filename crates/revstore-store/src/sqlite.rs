//! SQLite implementation of the storage traits.
//!
//! This is the persistent backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via `tokio::task::spawn_blocking`.
//!
//! A file-backed store runs in WAL mode with one writer connection and one
//! reader connection, so reads see the last committed state while a write
//! transaction is open.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use revstore_core::{ContentAddress, EnvelopeKind, NodeIdentity};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{BlobStore, InsertResult, NodeStore};

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

type SharedConnection = Arc<Mutex<Connection>>;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutexes. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    writer: SharedConnection,
    reader: SharedConnection,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut writer = Connection::open(path)?;
        writer.busy_timeout(BUSY_TIMEOUT)?;
        writer.pragma_update(None, "journal_mode", "WAL")?;
        migration::migrate(&mut writer)?;

        let reader = Connection::open(path)?;
        reader.busy_timeout(BUSY_TIMEOUT)?;

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            reader: Arc::new(Mutex::new(reader)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing. An in-memory database is private to its
    /// connection, so reads and writes share one.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            writer: conn.clone(),
            reader: conn,
        })
    }

    /// Run `f` against the writer connection on the blocking pool.
    async fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        blocking(self.writer.clone(), f).await
    }

    /// Run `f` against the reader connection on the blocking pool.
    async fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        blocking(self.reader.clone(), f).await
    }
}

async fn blocking<F, T>(conn: SharedConnection, f: F) -> Result<T>
where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = conn
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("connection mutex: {}", e)))?;
        f(&mut conn)
    })
    .await
    .map_err(|e| StoreError::Task(e.to_string()))?
}

#[async_trait]
impl NodeStore for SqliteStore {
    async fn insert_envelope(
        &self,
        kind: EnvelopeKind,
        node_id: &NodeIdentity,
        bytes: &[u8],
    ) -> Result<InsertResult> {
        let node_id = *node_id;
        let bytes = bytes.to_vec();

        self.write(move |conn| {
            // Compare and insert under one write lock.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT bytes FROM envelopes WHERE kind = ?1 AND node_id = ?2",
                    params![kind.to_u8(), node_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            let result = match existing {
                Some(existing) if existing == bytes => InsertResult::AlreadyExists,
                Some(_) => InsertResult::Conflict,
                None => {
                    tx.execute(
                        "INSERT INTO envelopes (kind, node_id, bytes, ingested_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            kind.to_u8(),
                            node_id.as_bytes().as_slice(),
                            bytes,
                            now_millis()
                        ],
                    )?;
                    InsertResult::Inserted
                }
            };

            tx.commit()?;
            Ok(result)
        })
        .await
    }

    async fn get_envelope(
        &self,
        kind: EnvelopeKind,
        node_id: &NodeIdentity,
    ) -> Result<Option<Bytes>> {
        let node_id = *node_id;

        self.read(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT bytes FROM envelopes WHERE kind = ?1 AND node_id = ?2",
                    params![kind.to_u8(), node_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(bytes.map(Bytes::from))
        })
        .await
    }

    async fn get_envelopes(
        &self,
        kind: EnvelopeKind,
        node_ids: &[NodeIdentity],
    ) -> Result<HashMap<NodeIdentity, Bytes>> {
        let node_ids = node_ids.to_vec();

        self.read(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT bytes FROM envelopes WHERE kind = ?1 AND node_id = ?2",
            )?;

            let mut found = HashMap::with_capacity(node_ids.len());
            for id in node_ids {
                let bytes: Option<Vec<u8>> = stmt
                    .query_row(params![kind.to_u8(), id.as_bytes().as_slice()], |row| {
                        row.get(0)
                    })
                    .optional()?;
                if let Some(bytes) = bytes {
                    found.insert(id, Bytes::from(bytes));
                }
            }
            Ok(found)
        })
        .await
    }

    async fn has_envelope(&self, kind: EnvelopeKind, node_id: &NodeIdentity) -> Result<bool> {
        let node_id = *node_id;

        self.read(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM envelopes WHERE kind = ?1 AND node_id = ?2)",
                params![kind.to_u8(), node_id.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }
}

#[async_trait]
impl BlobStore for SqliteStore {
    async fn get_blob(&self, address: &ContentAddress) -> Result<Option<Bytes>> {
        let address = *address;

        self.read(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT bytes FROM blobs WHERE address = ?1",
                    params![address.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(bytes.map(Bytes::from))
        })
        .await
    }

    async fn put_blob(&self, address: &ContentAddress, bytes: Bytes) -> Result<bool> {
        let address = *address;

        self.write(move |conn| {
            let written = conn.execute(
                "INSERT OR IGNORE INTO blobs (address, bytes, size, ingested_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    address.as_bytes().as_slice(),
                    bytes.as_ref(),
                    bytes.len() as i64,
                    now_millis()
                ],
            )?;
            Ok(written > 0)
        })
        .await
    }

    async fn has_blob(&self, address: &ContentAddress) -> Result<bool> {
        let address = *address;

        self.read(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM blobs WHERE address = ?1)",
                params![address.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }
}
