//! # redb-backed Session Store
//!
//! Disk persistence for session records using the redb embedded
//! database: ACID transactions, crash safety via copy-on-write B-trees,
//! and zero configuration.
//!
//! One table, keyed by session key, holding the encoded record bytes.
//! Every save is a single write transaction, which gives the atomic
//! upsert the store contract requires.

use crate::formats::{SessionRecord, decode_record, encode_record};
use crate::storage::{SessionStore, validate_key};
use crate::types::IskraError;
use redb::{Database, ReadableDatabase, TableDefinition};
use std::path::Path;

/// Table for sessions: session key -> encoded record bytes.
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

#[inline]
fn warn(message: &str) {
    crate::logging::warn("iskra_core::storage", message);
}

/// A disk-backed session store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a session database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IskraError> {
        let db = Database::create(path.as_ref())
            .map_err(|e| IskraError::Storage(e.to_string()))?;

        // Create the table up front so reads never race its absence.
        let write_txn = db
            .begin_write()
            .map_err(|e| IskraError::Storage(e.to_string()))?;
        let _ = write_txn
            .open_table(SESSIONS)
            .map_err(|e| IskraError::Storage(e.to_string()))?;
        write_txn
            .commit()
            .map_err(|e| IskraError::Storage(e.to_string()))?;

        Ok(Self { db })
    }
}

impl SessionStore for RedbStore {
    fn save(&self, key: &str, record: &SessionRecord) -> Result<(), IskraError> {
        validate_key(key)?;
        let bytes = encode_record(record)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| IskraError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(SESSIONS)
                .map_err(|e| IskraError::Storage(e.to_string()))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(|e| IskraError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| IskraError::Storage(e.to_string()))?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<SessionRecord>, IskraError> {
        validate_key(key)?;
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| IskraError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(SESSIONS)
            .map_err(|e| IskraError::Storage(e.to_string()))?;
        let Some(row) = table
            .get(key)
            .map_err(|e| IskraError::Storage(e.to_string()))?
        else {
            return Ok(None);
        };
        match decode_record(row.value()) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn(&format!("corrupt record for {key:?}, treating as absent: {e}"));
                Ok(None)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<(), IskraError> {
        validate_key(key)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| IskraError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(SESSIONS)
                .map_err(|e| IskraError::Storage(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| IskraError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| IskraError::Storage(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
