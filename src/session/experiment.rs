//! Experiment handle and the explicit advance result

use chrono::{DateTime, Utc};

use super::{fetch, persist, SharedStore};
use crate::experiment::{EventRecord, ExperimentRecord, Lifecycle, Trial, Tracked};
use crate::store::{Codec, Record, RecordKey};
use crate::Result;

/// Outcome of [`Experiment::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advance<'a> {
    /// A trial is now running.
    Next {
        /// Position of the trial in the sequence.
        index: usize,
        /// The running trial.
        trial: &'a Trial,
    },
    /// No trial is left to run, or the experiment had already ended.
    Exhausted,
}

impl Advance<'_> {
    /// Whether the sequence is exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Index of the running trial, if any.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        match self {
            Self::Next { index, .. } => Some(*index),
            Self::Exhausted => None,
        }
    }
}

/// An experiment record bound to its store.
///
/// Every mutating method persists before it returns. The caller drives
/// iteration and checks [`Experiment::is_running`] after every step:
///
/// ```rust
/// use expflow::{Advance, ParticipantProfile, Registry, Tracked, Trial};
///
/// let registry = Registry::in_memory();
/// registry.create_participant("p001", ParticipantProfile::new())?;
/// let trials = (0..3).map(|i| Trial::builder().trial_number(i).build()).collect();
/// let mut experiment = registry.create_experiment("p001", "stroop", trials)?;
///
/// while let Advance::Next { index, .. } = experiment.advance()? {
///     experiment.record_response(serde_json::json!({ "key": "f", "trial": index }))?;
///     if !experiment.is_running() {
///         break;
///     }
/// }
/// assert!(experiment.is_finished());
/// experiment.close()?;
/// # Ok::<(), expflow::Error>(())
/// ```
pub struct Experiment {
    record: ExperimentRecord,
    store: SharedStore,
    codec: Codec,
    released: bool,
}

impl Experiment {
    pub(crate) fn create(store: SharedStore, codec: Codec, record: ExperimentRecord) -> Result<Self> {
        let mut experiment = Self {
            record,
            store,
            codec,
            released: false,
        };
        if let Err(e) = experiment.save() {
            experiment.released = true;
            return Err(e);
        }
        Ok(experiment)
    }

    pub(crate) fn load(store: SharedStore, participant_id: &str, experiment_id: &str) -> Result<Self> {
        let key = RecordKey::experiment(participant_id, experiment_id);
        let (codec, record) = fetch(store.as_ref(), &key)?;
        let mut experiment = Self {
            record,
            store,
            codec,
            released: false,
        };
        // A record still marked running means its process never released it.
        if experiment.record.reconcile_at(Utc::now())? {
            tracing::warn!(
                record = %key,
                "experiment was left running; marked paused"
            );
            if let Err(e) = experiment.save() {
                experiment.released = true;
                return Err(e);
            }
        }
        Ok(experiment)
    }

    /// Get the participant ID.
    #[must_use]
    pub fn participant_id(&self) -> &str {
        self.record.participant_id()
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        self.record.experiment_id()
    }

    /// The underlying record.
    #[must_use]
    pub const fn record(&self) -> &ExperimentRecord {
        &self.record
    }

    /// Codec this record is stored with.
    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Cursor position.
    #[must_use]
    pub const fn trial_index(&self) -> Option<usize> {
        self.record.trial_index()
    }

    /// Trials in presentation order.
    #[must_use]
    pub fn trials(&self) -> &[Trial] {
        self.record.trials()
    }

    /// Trial under the cursor.
    #[must_use]
    pub fn current_trial(&self) -> Option<&Trial> {
        self.record.current_trial()
    }

    /// Whether the driving loop should keep going.
    ///
    /// Shadows [`Tracked::is_running`] so callers need no trait import.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.record.is_running()
    }

    /// Step to the next pending trial.
    ///
    /// The first call starts the experiment, a call on a paused experiment
    /// resumes it in place, and a call once no pending trial is left
    /// finishes it. On an ended experiment this returns
    /// [`Advance::Exhausted`] without touching the record.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn advance(&mut self) -> Result<Advance<'_>> {
        if self.record.is_terminal() {
            return Ok(Advance::Exhausted);
        }
        let step = self.mutate(ExperimentRecord::advance_at)?;
        Ok(match step.and_then(|index| Some((index, self.record.trial(index)?))) {
            Some((index, trial)) => Advance::Next { index, trial },
            None => Advance::Exhausted,
        })
    }

    /// Pause the experiment and its running trial.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] unless running.
    pub fn pause(&mut self) -> Result<()> {
        self.mutate(ExperimentRecord::pause_at)
    }

    /// Skip an experiment that has not started, with all its trials.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] unless pending.
    pub fn skip(&mut self) -> Result<()> {
        self.mutate(ExperimentRecord::skip_at)
    }

    /// Time out the experiment; the running trial times out and pending
    /// trials are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] unless running.
    pub fn time_out(&mut self) -> Result<()> {
        self.mutate(ExperimentRecord::time_out_at)
    }

    /// End the experiment early; pending trials are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] unless running.
    pub fn finish(&mut self) -> Result<()> {
        self.mutate(ExperimentRecord::finish_at)
    }

    /// Finish the current trial without advancing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoCurrentTrial`] before iteration and
    /// [`crate::Error::InvalidTransition`] if the trial is not running.
    pub fn finish_trial(&mut self) -> Result<()> {
        self.mutate(ExperimentRecord::finish_trial_at)
    }

    /// Time out the current trial without advancing.
    ///
    /// # Errors
    ///
    /// As [`Self::finish_trial`].
    pub fn time_out_trial(&mut self) -> Result<()> {
        self.mutate(ExperimentRecord::time_out_trial_at)
    }

    /// Skip the pending trial at `index` so the cursor passes over it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for an index out of range and
    /// [`crate::Error::InvalidTransition`] for a trial that is not pending.
    pub fn skip_trial(&mut self, index: usize) -> Result<()> {
        self.mutate(|record, now| record.skip_trial_at(index, now))
    }

    /// Store the response on the current trial.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoCurrentTrial`] before iteration.
    pub fn record_response(&mut self, response: serde_json::Value) -> Result<()> {
        self.mutate(|record, _| record.set_response(response))
    }

    /// Note an experiment-level event.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn record_event(&mut self, name: &str, payload: Option<serde_json::Value>) -> Result<()> {
        self.mutate(|record, now| {
            record.record_event(event(name, payload, now));
            Ok(())
        })
    }

    /// Note an event on the current trial.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoCurrentTrial`] before iteration.
    pub fn record_trial_event(&mut self, name: &str, payload: Option<serde_json::Value>) -> Result<()> {
        self.mutate(|record, now| record.record_trial_event(event(name, payload, now)))
    }

    /// Append a trial before iteration begins.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SequenceMutation`] once iteration has begun.
    pub fn append_trial(&mut self, trial: Trial) -> Result<()> {
        self.mutate(|record, _| record.append_trial(trial))
    }

    /// Append several trials with a single save.
    ///
    /// # Errors
    ///
    /// As [`Self::append_trial`]; trials before the failing one stay
    /// appended and are saved.
    pub fn append_trials(&mut self, trials: impl IntoIterator<Item = Trial>) -> Result<()> {
        let outcome = trials
            .into_iter()
            .try_for_each(|trial| self.record.append_trial(trial));
        self.save()?;
        outcome
    }

    /// Insert a trial at `index` before iteration begins.
    ///
    /// # Errors
    ///
    /// As [`ExperimentRecord::insert_trial`].
    pub fn insert_trial(&mut self, index: usize, trial: Trial) -> Result<()> {
        self.mutate(|record, _| record.insert_trial(index, trial))
    }

    /// Reorder trials before iteration begins.
    ///
    /// # Errors
    ///
    /// As [`ExperimentRecord::reorder_trials`].
    pub fn reorder_trials(&mut self, order: &[usize]) -> Result<()> {
        self.mutate(|record, _| record.reorder_trials(order))
    }

    /// Persist the record now.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn save(&mut self) -> Result<()> {
        persist(self.store.as_ref(), self.codec, &mut self.record)
    }

    /// Release the handle: a running experiment is paused, then saved.
    ///
    /// # Errors
    ///
    /// Returns any persistence error.
    pub fn close(mut self) -> Result<()> {
        self.release()
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

    fn mutate<T>(
        &mut self,
        f: impl FnOnce(&mut ExperimentRecord, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let out = f(&mut self.record, Utc::now())?;
        self.save()?;
        Ok(out)
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        if self.record.reconcile_at(Utc::now())? {
            tracing::warn!(
                record = %self.record.key(),
                "released while running; marked paused"
            );
        }
        self.save()
    }
}

fn event(name: &str, payload: Option<serde_json::Value>, at: DateTime<Utc>) -> EventRecord {
    let event = EventRecord::new(name).at_time(at);
    match payload {
        Some(payload) => event.with_payload(payload),
        None => event,
    }
}

impl Tracked for Experiment {
    fn lifecycle(&self) -> &Lifecycle {
        Tracked::lifecycle(&self.record)
    }
}

impl std::fmt::Debug for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment")
            .field("participant_id", &self.participant_id())
            .field("experiment_id", &self.experiment_id())
            .field("status", &self.record.status())
            .field("trial_index", &self.trial_index())
            .finish_non_exhaustive()
    }
}

impl Drop for Experiment {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.release() {
            tracing::error!(
                participant_id = %self.record.participant_id(),
                experiment_id = %self.record.experiment_id(),
                error = %e,
                "failed to save experiment on release"
            );
        }
    }
}
