//! Database schema migrations for SQLite.
//!
//! Versioned migrations: each step is SQL that moves the schema from
//! version N to N+1, recorded in `schema_migrations`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated schema");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: envelope keyspaces and blob storage.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Encoded envelopes, one row per (kind, node_id). Rows are never updated.
        CREATE TABLE envelopes (
            kind INTEGER NOT NULL,            -- 1=manifest, 2=file
            node_id BLOB NOT NULL,            -- 20 bytes, historical identity
            bytes BLOB NOT NULL,              -- canonical envelope encoding
            ingested_at INTEGER NOT NULL,     -- local timestamp of ingestion
            PRIMARY KEY (kind, node_id)
        );

        -- Content-addressed blobs.
        CREATE TABLE blobs (
            address BLOB PRIMARY KEY,         -- 32 bytes, Blake3 of bytes
            bytes BLOB NOT NULL,
            size INTEGER NOT NULL,
            ingested_at INTEGER NOT NULL
        );

        CREATE INDEX idx_envelopes_ingested ON envelopes(ingested_at);
        "#,
    )?;

    Ok(())
}

/// Current wall-clock time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
