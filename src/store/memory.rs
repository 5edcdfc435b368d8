//! In-memory record store using `DashMap`.
//!
//! Data is lost when the store is dropped; it exists for tests and for
//! embedding expflow where another layer owns durability.

use dashmap::DashMap;

use super::{Codec, RecordKey, RecordKind, RecordStore};
use crate::Result;

/// In-memory record store.
///
/// # Example
///
/// ```rust
/// use expflow::store::{Codec, MemoryRecordStore, RecordKey, RecordStore};
///
/// let store = MemoryRecordStore::new();
/// store.write(&RecordKey::participant("p001"), Codec::Plain, b"{}")?;
/// assert_eq!(store.len(), 1);
/// # Ok::<(), expflow::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: DashMap<RecordKey, (Codec, Vec<u8>)>,
}

impl MemoryRecordStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every record.
    pub fn clear(&self) {
        self.records.clear();
    }
}

impl RecordStore for MemoryRecordStore {
    fn read(&self, key: &RecordKey) -> Result<Option<(Codec, Vec<u8>)>> {
        Ok(self.records.get(key).map(|entry| entry.value().clone()))
    }

    fn write(&self, key: &RecordKey, codec: Codec, bytes: &[u8]) -> Result<()> {
        self.records.insert(key.clone(), (codec, bytes.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &RecordKey) -> Result<bool> {
        Ok(self.records.remove(key).is_some())
    }

    fn keys(&self, kind: RecordKind) -> Result<Vec<RecordKey>> {
        let mut keys: Vec<RecordKey> = self
            .records
            .iter()
            .filter(|entry| entry.key().kind() == kind)
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn exists(&self, key: &RecordKey) -> Result<bool> {
        Ok(self.records.contains_key(key))
    }

    fn is_ephemeral(&self) -> bool {
        true
    }
}
