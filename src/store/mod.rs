//! Record Store - durable storage for participant and experiment records
//!
//! Records are keyed by a participant id, or by a participant/experiment id
//! pair, and encoded with a [`Codec`] chosen per record. A store only reads
//! and writes bytes; it never owns the records it holds.
//!
//! # Example
//!
//! ```rust
//! use expflow::store::{Codec, MemoryRecordStore, RecordKey, RecordStore};
//!
//! let store = MemoryRecordStore::new();
//! let key = RecordKey::participant("p001");
//!
//! store.write(&key, Codec::Gzip, b"{}")?;
//! assert!(store.exists(&key)?);
//! let (codec, bytes) = store.read(&key)?.expect("written above");
//! assert_eq!(codec, Codec::Gzip);
//! assert_eq!(bytes, b"{}");
//! # Ok::<(), expflow::Error>(())
//! ```

mod codec;
mod file;
mod memory;

pub use codec::Codec;
pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Which family of records a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// `participants/<participant_id>`
    Participant,
    /// `experiments/<participant_id>.<experiment_id>`
    Experiment,
}

impl RecordKind {
    /// Name used in record tags and messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Experiment => "experiment",
        }
    }

    /// Subdirectory holding records of this kind.
    #[must_use]
    pub const fn dir_name(&self) -> &'static str {
        match self {
            Self::Participant => "participants",
            Self::Experiment => "experiments",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage key of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    /// A participant record.
    Participant {
        /// Participant id
        participant_id: String,
    },
    /// An experiment record.
    Experiment {
        /// Participant id
        participant_id: String,
        /// Experiment id
        experiment_id: String,
    },
}

impl RecordKey {
    /// Key of a participant record.
    #[must_use]
    pub fn participant(participant_id: impl Into<String>) -> Self {
        Self::Participant {
            participant_id: participant_id.into(),
        }
    }

    /// Key of an experiment record.
    #[must_use]
    pub fn experiment(participant_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self::Experiment {
            participant_id: participant_id.into(),
            experiment_id: experiment_id.into(),
        }
    }

    /// Record family.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Participant { .. } => RecordKind::Participant,
            Self::Experiment { .. } => RecordKind::Experiment,
        }
    }

    /// Participant id, present on every key.
    #[must_use]
    pub fn participant_id(&self) -> &str {
        match self {
            Self::Participant { participant_id } | Self::Experiment { participant_id, .. } => {
                participant_id
            }
        }
    }

    /// Experiment id, for experiment keys.
    #[must_use]
    pub fn experiment_id(&self) -> Option<&str> {
        match self {
            Self::Participant { .. } => None,
            Self::Experiment { experiment_id, .. } => Some(experiment_id),
        }
    }

    /// File stem without extension: `p001` or `p001.stroop`.
    #[must_use]
    pub fn stem(&self) -> String {
        match self {
            Self::Participant { participant_id } => participant_id.clone(),
            Self::Experiment {
                participant_id,
                experiment_id,
            } => format!("{participant_id}.{experiment_id}"),
        }
    }

    /// File name for this key under `codec`.
    #[must_use]
    pub fn file_name(&self, codec: Codec) -> String {
        format!("{}.{}", self.stem(), codec.extension())
    }

    /// Parse a file name back into a key of `kind`.
    ///
    /// Returns `None` for names that are not record files (temp files,
    /// foreign files, malformed experiment names).
    #[must_use]
    pub fn from_file_name(kind: RecordKind, name: &str) -> Option<(Self, Codec)> {
        let (stem, codec) = Codec::ALL.into_iter().find_map(|codec| {
            name.strip_suffix(codec.extension())
                .and_then(|rest| rest.strip_suffix('.'))
                .map(|stem| (stem, codec))
        })?;
        if stem.is_empty() || stem.starts_with('.') {
            return None;
        }
        match kind {
            RecordKind::Participant => Some((Self::participant(stem), codec)),
            RecordKind::Experiment => {
                let (participant_id, experiment_id) = stem.split_once('.')?;
                if participant_id.is_empty() || experiment_id.is_empty() {
                    return None;
                }
                Some((Self::experiment(participant_id, experiment_id), codec))
            }
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.stem())
    }
}

/// Byte-level storage for records.
///
/// Implementations are synchronous: every call has completed (and, for
/// durable stores, reached disk) when it returns.
pub trait RecordStore: Send + Sync {
    /// Read a record, trying the plain encoding before the compressed one.
    ///
    /// Returns `None` if no record exists under either encoding.
    fn read(&self, key: &RecordKey) -> Result<Option<(Codec, Vec<u8>)>>;

    /// Write a record, replacing any copy stored under the other codec.
    fn write(&self, key: &RecordKey, codec: Codec, bytes: &[u8]) -> Result<()>;

    /// Remove a record under every codec. Returns whether anything was removed.
    fn delete(&self, key: &RecordKey) -> Result<bool>;

    /// All keys of `kind`, sorted.
    fn keys(&self, kind: RecordKind) -> Result<Vec<RecordKey>>;

    /// Whether a record exists under any codec.
    fn exists(&self, key: &RecordKey) -> Result<bool> {
        Ok(self.read(key)?.is_some())
    }

    /// Whether the store loses its contents when dropped.
    fn is_ephemeral(&self) -> bool {
        false
    }
}

/// A serializable record with a fixed kind tag.
pub trait Record: Serialize + DeserializeOwned {
    /// Kind tag written into every record of this type.
    const KIND: RecordKind;

    /// Storage key of this record.
    fn key(&self) -> RecordKey;
}

/// Decode `bytes` as a `T`, checking the `kind` tag first.
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] when the record is tagged with another
/// kind, and [`Error::Serialization`] for malformed records.
pub fn decode_record<T: Record>(codec: Codec, bytes: &[u8]) -> Result<T> {
    let value: serde_json::Value = codec.decode(bytes)?;
    let found = value
        .get("kind")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("untagged");
    if found != T::KIND.as_str() {
        return Err(Error::TypeMismatch {
            expected: T::KIND.as_str().to_string(),
            found: found.to_string(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let p = RecordKey::participant("p001");
        let e = RecordKey::experiment("p001", "stroop");
        assert_eq!(p.file_name(Codec::Plain), "p001.json");
        assert_eq!(e.file_name(Codec::Gzip), "p001.stroop.json.gz");
        assert_eq!(e.participant_id(), "p001");
        assert_eq!(e.experiment_id(), Some("stroop"));
        assert_eq!(p.experiment_id(), None);
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(
            RecordKey::from_file_name(RecordKind::Participant, "p001.json.gz"),
            Some((RecordKey::participant("p001"), Codec::Gzip))
        );
        assert_eq!(
            RecordKey::from_file_name(RecordKind::Experiment, "p001.stroop.json"),
            Some((RecordKey::experiment("p001", "stroop"), Codec::Plain))
        );
        assert_eq!(RecordKey::from_file_name(RecordKind::Experiment, "p001.json"), None);
        assert_eq!(RecordKey::from_file_name(RecordKind::Participant, "notes.txt"), None);
        assert_eq!(
            RecordKey::from_file_name(RecordKind::Participant, ".p001.json.tmp.1.2"),
            None
        );
    }

    #[test]
    fn test_kind_dirs() {
        assert_eq!(RecordKind::Participant.dir_name(), "participants");
        assert_eq!(RecordKind::Experiment.dir_name(), "experiments");
    }
}
