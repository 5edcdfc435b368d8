//! Identity Registry - creating and loading records by key
//!
//! Existence is decided by the record store alone, so uniqueness of
//! participant ids and `(participant_id, experiment_id)` pairs holds
//! across process restarts.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::Config;
use crate::experiment::{ExperimentRecord, ParticipantProfile, ParticipantRecord, Trial};
use crate::session::{Experiment, Participant, SharedStore};
use crate::store::{Codec, MemoryRecordStore, RecordKey, RecordKind};
use crate::{Error, Result};

const MIN_ID_LEN: usize = 3;

/// Whether `id` is usable as a participant or experiment id.
///
/// Ids are at least three characters of ASCII letters, digits, `_` or `-`,
/// which keeps them safe as file name components.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    id.len() >= MIN_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn validate_id(what: &str, id: &str) -> Result<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        tracing::debug!(id, "rejected {what} id");
        Err(Error::InvalidId(id.to_string()))
    }
}

/// Entry point: creates, loads and lists participants and experiments.
#[derive(Clone)]
pub struct Registry {
    store: SharedStore,
    codec: Codec,
}

impl Registry {
    /// Open the file store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the base directory cannot be created.
    pub fn open(config: &Config) -> Result<Self> {
        let store = config.open_store()?;
        Ok(Self::with_store(Arc::new(store), config.codec()))
    }

    /// Use an existing store; `codec` applies to newly created records.
    #[must_use]
    pub fn with_store(store: SharedStore, codec: Codec) -> Self {
        Self { store, codec }
    }

    /// Registry over a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryRecordStore::new()), Codec::default())
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Codec for newly created records.
    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Whether records vanish when the store is dropped.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.store.is_ephemeral()
    }

    /// Whether a participant record exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] for a malformed id, or any storage error.
    pub fn participant_exists(&self, participant_id: &str) -> Result<bool> {
        validate_id("participant", participant_id)?;
        self.store.exists(&RecordKey::participant(participant_id))
    }

    /// Whether an experiment record exists for the pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] for malformed ids, or any storage error.
    pub fn experiment_exists(&self, participant_id: &str, experiment_id: &str) -> Result<bool> {
        validate_id("participant", participant_id)?;
        validate_id("experiment", experiment_id)?;
        self.store
            .exists(&RecordKey::experiment(participant_id, experiment_id))
    }

    /// Create and persist a new participant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] for a malformed id and
    /// [`Error::ParticipantExists`] if the id is taken.
    pub fn create_participant(
        &self,
        participant_id: &str,
        profile: ParticipantProfile,
    ) -> Result<Participant> {
        validate_id("participant", participant_id)?;
        if self.participant_exists(participant_id)? {
            return Err(Error::ParticipantExists {
                participant_id: participant_id.to_string(),
            });
        }
        tracing::debug!(participant_id, "creating participant");
        Participant::create(
            Arc::clone(&self.store),
            self.codec,
            ParticipantRecord::new(participant_id, profile),
        )
    }

    /// Load an existing participant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] for a malformed id and
    /// [`Error::RecordNotFound`] if there is no such participant.
    pub fn load_participant(&self, participant_id: &str) -> Result<Participant> {
        validate_id("participant", participant_id)?;
        Participant::load(Arc::clone(&self.store), participant_id)
    }

    /// Create and persist a new pending experiment holding `trials`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] for malformed ids,
    /// [`Error::ParticipantDoesNotExist`] for an unknown participant,
    /// [`Error::ExperimentExists`] if the pair is taken and
    /// [`Error::InvalidInput`] if a trial is not pending. Nothing is
    /// written on error.
    pub fn create_experiment(
        &self,
        participant_id: &str,
        experiment_id: &str,
        trials: Vec<Trial>,
    ) -> Result<Experiment> {
        validate_id("participant", participant_id)?;
        validate_id("experiment", experiment_id)?;
        if !self.participant_exists(participant_id)? {
            return Err(Error::ParticipantDoesNotExist {
                participant_id: participant_id.to_string(),
            });
        }
        if self.experiment_exists(participant_id, experiment_id)? {
            return Err(Error::ExperimentExists {
                participant_id: participant_id.to_string(),
                experiment_id: experiment_id.to_string(),
            });
        }

        let mut record = ExperimentRecord::new(participant_id, experiment_id);
        for trial in trials {
            record.append_trial(trial)?;
        }
        tracing::debug!(
            participant_id,
            experiment_id,
            trials = record.len(),
            "creating experiment"
        );
        Experiment::create(Arc::clone(&self.store), self.codec, record)
    }

    /// Load an existing experiment.
    ///
    /// A record still marked `running` belonged to a process that died
    /// without releasing it; it is paused and saved before being returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] for malformed ids and
    /// [`Error::RecordNotFound`] if there is no such experiment.
    pub fn load_experiment(&self, participant_id: &str, experiment_id: &str) -> Result<Experiment> {
        validate_id("participant", participant_id)?;
        validate_id("experiment", experiment_id)?;
        Experiment::load(Arc::clone(&self.store), participant_id, experiment_id)
    }

    /// All participant ids, sorted.
    ///
    /// # Errors
    ///
    /// Returns any storage error.
    pub fn participant_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .keys(RecordKind::Participant)?
            .iter()
            .map(|key| key.participant_id().to_string())
            .collect())
    }

    /// Distinct experiment ids across all participants, sorted.
    ///
    /// # Errors
    ///
    /// Returns any storage error.
    pub fn experiment_ids(&self) -> Result<Vec<String>> {
        let ids: BTreeSet<String> = self
            .store
            .keys(RecordKind::Experiment)?
            .iter()
            .filter_map(RecordKey::experiment_id)
            .map(str::to_string)
            .collect();
        Ok(ids.into_iter().collect())
    }

    /// Experiment ids the participant has a record for, sorted.
    ///
    /// # Errors
    ///
    /// Returns any storage error.
    pub fn participated_in(&self, participant_id: &str) -> Result<Vec<String>> {
        Ok(self
            .store
            .keys(RecordKind::Experiment)?
            .iter()
            .filter(|key| key.participant_id() == participant_id)
            .filter_map(RecordKey::experiment_id)
            .map(str::to_string)
            .collect())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("codec", &self.codec)
            .field("ephemeral", &self.is_ephemeral())
            .finish_non_exhaustive()
    }
}
