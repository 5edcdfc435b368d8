//! Autosaving handles for participants and experiments
//!
//! A handle owns one record plus a reference to the store it came from.
//! Every mutating call ends with a synchronous persist, and the persist
//! has completed when the call returns.
//!
//! Handles are released exactly once, either by `close()` (errors are
//! returned) or by going out of scope (errors are logged). Releasing a
//! running experiment pauses it first, so an abandoned session is left
//! resumable on disk rather than stuck in `running`.

mod experiment;
mod participant;

pub use experiment::{Advance, Experiment};
pub use participant::Participant;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::experiment::{ExperimentRecord, ParticipantRecord};
use crate::store::{decode_record, Codec, Record, RecordKey, RecordStore};
use crate::{Error, Result};

/// Shared handle to a record store.
pub type SharedStore = Arc<dyn RecordStore>;

/// Records that carry a last-saved timestamp.
trait Persisted: Record {
    fn touch(&mut self, at: DateTime<Utc>);
}

impl Persisted for ParticipantRecord {
    fn touch(&mut self, at: DateTime<Utc>) {
        self.meta_mut().touch(at);
    }
}

impl Persisted for ExperimentRecord {
    fn touch(&mut self, at: DateTime<Utc>) {
        self.meta_mut().touch(at);
    }
}

fn persist<R: Persisted>(store: &dyn RecordStore, codec: Codec, record: &mut R) -> Result<()> {
    let key = record.key();
    record.touch(Utc::now());
    let bytes = codec.encode(record)?;
    store.write(&key, codec, &bytes)?;
    tracing::info!(record = %key, codec = codec.as_str(), "saved");
    Ok(())
}

fn fetch<R: Record>(store: &dyn RecordStore, key: &RecordKey) -> Result<(Codec, R)> {
    let (codec, bytes) = store.read(key)?.ok_or_else(|| Error::RecordNotFound {
        key: key.to_string(),
    })?;
    let record: R = decode_record(codec, &bytes)?;
    if record.key() != *key {
        return Err(Error::StorageError(format!(
            "record stored as {key} identifies itself as {}",
            record.key()
        )));
    }
    tracing::info!(record = %key, codec = codec.as_str(), "loaded");
    Ok((codec, record))
}
