//! Participant handle

use super::{fetch, persist, SharedStore};
use crate::experiment::{ParticipantProfile, ParticipantRecord};
use crate::store::{Codec, Record, RecordKey};
use crate::Result;

/// A participant record bound to its store.
///
/// Created through [`crate::Registry::create_participant`] or
/// [`crate::Registry::load_participant`]. Annotation setters persist
/// immediately; the record is saved once more on release.
pub struct Participant {
    record: ParticipantRecord,
    store: SharedStore,
    codec: Codec,
    released: bool,
}

impl Participant {
    pub(crate) fn create(store: SharedStore, codec: Codec, record: ParticipantRecord) -> Result<Self> {
        let mut participant = Self {
            record,
            store,
            codec,
            released: false,
        };
        if let Err(e) = participant.save() {
            // Never hand out an object whose record did not reach the store.
            participant.released = true;
            return Err(e);
        }
        Ok(participant)
    }

    pub(crate) fn load(store: SharedStore, participant_id: &str) -> Result<Self> {
        let (codec, record) = fetch(store.as_ref(), &RecordKey::participant(participant_id))?;
        Ok(Self {
            record,
            store,
            codec,
            released: false,
        })
    }

    /// Get the participant ID.
    #[must_use]
    pub fn participant_id(&self) -> &str {
        self.record.participant_id()
    }

    /// The underlying record.
    #[must_use]
    pub const fn record(&self) -> &ParticipantRecord {
        &self.record
    }

    /// Demographics.
    #[must_use]
    pub const fn profile(&self) -> &ParticipantProfile {
        self.record.profile()
    }

    /// Codec this record is stored with.
    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Replace the comments.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn set_comments(&mut self, comments: Option<String>) -> Result<()> {
        self.record.profile_mut().set_comments(comments);
        self.save()
    }

    /// Append a line to the comments.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn append_comment(&mut self, line: &str) -> Result<()> {
        self.record.profile_mut().append_comment(line);
        self.save()
    }

    /// Replace the group.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn set_group(&mut self, group: Option<String>) -> Result<()> {
        self.record.profile_mut().set_group(group);
        self.save()
    }

    /// Replace the language code.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn set_language(&mut self, language: Option<String>) -> Result<()> {
        self.record.profile_mut().set_language(language);
        self.save()
    }

    /// Set a study-specific attribute.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) -> Result<()> {
        self.record.profile_mut().set_attribute(key.into(), value);
        self.save()
    }

    /// Persist the record now.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn save(&mut self) -> Result<()> {
        persist(self.store.as_ref(), self.codec, &mut self.record)
    }

    /// Final save and release.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn close(mut self) -> Result<()> {
        self.released = true;
        self.save()
    }

    /// Remove the record from the store. Nothing is saved on release.
    ///
    /// # Errors
    ///
    /// Returns any storage error.
    pub fn delete(mut self) -> Result<()> {
        self.released = true;
        let key = self.record.key();
        if self.store.delete(&key)? {
            tracing::info!(record = %key, "deleted");
        } else {
            tracing::warn!(record = %key, "nothing to delete");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("participant_id", &self.participant_id())
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl Drop for Participant {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.save() {
            tracing::error!(
                participant_id = %self.record.participant_id(),
                error = %e,
                "failed to save participant on release"
            );
        }
    }
}
