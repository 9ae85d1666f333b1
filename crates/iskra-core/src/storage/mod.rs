//! # Session Storage
//!
//! Durable per-key storage of session records.
//!
//! The [`SessionStore`] trait keeps backends uniform: an in-memory map
//! for tests and embedded use, and a redb-backed store for real
//! deployments. Backends report I/O failures as errors; the engine layer
//! decides how to degrade (save failures are swallowed, load failures
//! become "absent").
//!
//! Corruption is not an I/O failure: a record that parses as garbage
//! degrades to `None` inside the backend itself, because every caller
//! wants the same answer ("no session found") and none can repair it.

pub mod redb_store;

pub use redb_store::RedbStore;

use crate::formats::{SessionRecord, decode_record, encode_record};
use crate::primitives::MAX_SESSION_KEY_LENGTH;
use crate::types::IskraError;
use std::collections::BTreeMap;

#[inline]
fn warn(message: &str) {
    crate::logging::warn("iskra_core::storage", message);
}

/// Reject keys that are empty or oversized before they touch a backend.
pub(crate) fn validate_key(key: &str) -> Result<(), IskraError> {
    if key.is_empty() {
        return Err(IskraError::Validation("session key is empty".into()));
    }
    if key.len() > MAX_SESSION_KEY_LENGTH {
        return Err(IskraError::Validation(format!(
            "session key of {} bytes exceeds limit {}",
            key.len(),
            MAX_SESSION_KEY_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// SESSIONSTORE TRAIT
// =============================================================================

/// Durable per-key storage of a session record.
///
/// All operations are synchronous; the transport layer wraps calls in
/// its own blocking boundary when needed.
pub trait SessionStore: Send + Sync {
    /// Atomically upsert the record under `key`.
    fn save(&self, key: &str, record: &SessionRecord) -> Result<(), IskraError>;

    /// Load the record under `key`, `None` when absent or unreadable.
    fn load(&self, key: &str) -> Result<Option<SessionRecord>, IskraError>;

    /// Remove the record under `key`. Removing an absent key is fine.
    fn delete(&self, key: &str) -> Result<(), IskraError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// In-memory backend holding encoded record bytes.
///
/// Stores the encoded form rather than the record itself so the decode
/// path is exercised exactly as it is against disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: std::sync::Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a row with raw bytes. Test hook for corruption cases.
    pub fn put_raw(&self, key: &str, bytes: Vec<u8>) {
        if let Ok(mut rows) = self.rows.lock() {
            rows.insert(key.to_owned(), bytes);
        }
    }
}

impl SessionStore for MemoryStore {
    fn save(&self, key: &str, record: &SessionRecord) -> Result<(), IskraError> {
        validate_key(key)?;
        let bytes = encode_record(record)?;
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| IskraError::Storage("memory store lock poisoned".into()))?;
        rows.insert(key.to_owned(), bytes);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<SessionRecord>, IskraError> {
        validate_key(key)?;
        let rows = self
            .rows
            .lock()
            .map_err(|_| IskraError::Storage("memory store lock poisoned".into()))?;
        let Some(bytes) = rows.get(key) else {
            return Ok(None);
        };
        match decode_record(bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn(&format!("corrupt record for {key:?}, treating as absent: {e}"));
                Ok(None)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<(), IskraError> {
        validate_key(key)?;
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| IskraError::Storage("memory store lock poisoned".into()))?;
        rows.remove(key);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Phase;

    #[test]
    fn save_load_roundtrip() {
        let store = MemoryStore::new();
        let mut record = SessionRecord::default();
        record.phase = Phase::Darkness.name().to_owned();
        store.save("user-1", &record).expect("save");
        let back = store.load("user-1").expect("load").expect("present");
        assert_eq!(back.phase(), Phase::Darkness);
    }

    #[test]
    fn missing_key_is_absent() {
        let store = MemoryStore::new();
        assert!(store.load("nobody").expect("load").is_none());
    }

    #[test]
    fn corrupt_row_degrades_to_absent() {
        let store = MemoryStore::new();
        store.put_raw("user-1", b"}}}{".to_vec());
        assert!(store.load("user-1").expect("load").is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store
            .save("user-1", &SessionRecord::default())
            .expect("save");
        store.delete("user-1").expect("first delete");
        store.delete("user-1").expect("second delete");
        assert!(store.load("user-1").expect("load").is_none());
    }

    #[test]
    fn oversized_key_is_rejected() {
        let store = MemoryStore::new();
        let key = "k".repeat(MAX_SESSION_KEY_LENGTH + 1);
        assert!(store.save(&key, &SessionRecord::default()).is_err());
    }
}
