//! Experiment Record - one participant's run through one experiment

use serde::{Deserialize, Serialize};

use super::event_record::EventRecord;
use super::lifecycle::{Lifecycle, Tracked};
use super::record_meta::RecordMeta;
use super::trial::Trial;
use crate::store::{Record, RecordKey, RecordKind};
use crate::{Error, Result};

/// Experiment Record represents a participant performing an experiment.
///
/// The `(participant_id, experiment_id)` pair is unique across all
/// persisted records: a participant may run many experiments and an
/// experiment may be run by many participants, but never the same pair
/// twice.
///
/// The record owns its trial sequence and the cursor (`trial_index`)
/// into it. The sequence is frozen once iteration has begun.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    kind: RecordKind,
    participant_id: String,
    experiment_id: String,
    #[serde(flatten)]
    meta: RecordMeta,
    pub(super) trial_index: Option<usize>,
    #[serde(default)]
    pub(super) trials: Vec<Trial>,
    #[serde(default)]
    events: Vec<EventRecord>,
    #[serde(flatten)]
    pub(super) lifecycle: Lifecycle,
}

impl ExperimentRecord {
    /// Create a pending experiment record with no trials.
    #[must_use]
    pub fn new(participant_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Experiment,
            participant_id: participant_id.into(),
            experiment_id: experiment_id.into(),
            meta: RecordMeta::new(),
            trial_index: None,
            trials: Vec::new(),
            events: Vec::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Get the participant ID.
    #[must_use]
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Identification metadata.
    #[must_use]
    pub const fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    /// Cursor position; `None` until iteration begins.
    #[must_use]
    pub const fn trial_index(&self) -> Option<usize> {
        self.trial_index
    }

    /// Trials in presentation order.
    #[must_use]
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Trial at `index`.
    #[must_use]
    pub fn trial(&self, index: usize) -> Option<&Trial> {
        self.trials.get(index)
    }

    /// Number of trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether the experiment has no trials.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Trial under the cursor.
    #[must_use]
    pub fn current_trial(&self) -> Option<&Trial> {
        self.trial_index.and_then(|i| self.trials.get(i))
    }

    /// Trial before the cursor.
    #[must_use]
    pub fn previous_trial(&self) -> Option<&Trial> {
        self.trial_index
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.trials.get(i))
    }

    /// Trial after the cursor (the first trial before iteration begins).
    #[must_use]
    pub fn next_trial(&self) -> Option<&Trial> {
        self.trials.get(self.trial_index.map_or(0, |i| i + 1))
    }

    /// Trials after the cursor (all of them before iteration begins).
    #[must_use]
    pub fn remaining_trials(&self) -> &[Trial] {
        let from = self.trial_index.map_or(0, |i| i + 1).min(self.trials.len());
        &self.trials[from..]
    }

    /// Whether the cursor is on the first trial.
    #[must_use]
    pub fn is_first_trial(&self) -> bool {
        self.trial_index == Some(0)
    }

    /// Experiment-level events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Append a trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequenceMutation`] once iteration has begun or the
    /// experiment has ended, and [`Error::InvalidInput`] for a trial that
    /// is not pending.
    pub fn append_trial(&mut self, trial: Trial) -> Result<()> {
        self.ensure_sequence_open()?;
        ensure_fresh(&trial)?;
        self.trials.push(trial);
        Ok(())
    }

    /// Insert a trial at `index`, shifting later trials.
    ///
    /// # Errors
    ///
    /// As [`Self::append_trial`], plus [`Error::InvalidInput`] when
    /// `index > len`.
    pub fn insert_trial(&mut self, index: usize, trial: Trial) -> Result<()> {
        self.ensure_sequence_open()?;
        ensure_fresh(&trial)?;
        if index > self.trials.len() {
            return Err(Error::InvalidInput(format!(
                "insert index {index} is past the end of {} trials",
                self.trials.len()
            )));
        }
        self.trials.insert(index, trial);
        Ok(())
    }

    /// Reorder trials so that new position `i` holds old trial `order[i]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequenceMutation`] once iteration has begun and
    /// [`Error::InvalidInput`] if `order` is not a permutation of
    /// `0..len`.
    pub fn reorder_trials(&mut self, order: &[usize]) -> Result<()> {
        self.ensure_sequence_open()?;
        let mut seen = vec![false; self.trials.len()];
        if order.len() != seen.len() {
            return Err(Error::InvalidInput(format!(
                "order has {} entries for {} trials",
                order.len(),
                seen.len()
            )));
        }
        for &i in order {
            match seen.get_mut(i) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "order is not a permutation (bad index {i})"
                    )))
                }
            }
        }
        let mut old: Vec<Option<Trial>> = self.trials.drain(..).map(Some).collect();
        self.trials = order.iter().filter_map(|&i| old[i].take()).collect();
        Ok(())
    }

    /// Note an experiment-level event.
    pub fn record_event(&mut self, event: EventRecord) {
        self.events.push(event);
    }

    /// Note an event on the current trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCurrentTrial`] before iteration begins.
    pub fn record_trial_event(&mut self, event: EventRecord) -> Result<()> {
        self.current_trial_mut()?.record_event(event);
        Ok(())
    }

    /// Store the participant's response on the current trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCurrentTrial`] before iteration begins.
    pub fn set_response(&mut self, response: serde_json::Value) -> Result<()> {
        self.current_trial_mut()?.set_response(response);
        Ok(())
    }

    pub(crate) fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    pub(super) fn current_trial_mut(&mut self) -> Result<&mut Trial> {
        let index = self.trial_index.ok_or(Error::NoCurrentTrial)?;
        self.trials.get_mut(index).ok_or(Error::NoCurrentTrial)
    }

    fn ensure_sequence_open(&self) -> Result<()> {
        if let Some(index) = self.trial_index {
            return Err(Error::SequenceMutation(format!(
                "iteration has started (trial_index = {index})"
            )));
        }
        let status = self.lifecycle.status();
        if status.is_terminal() {
            return Err(Error::SequenceMutation(format!("experiment is {status}")));
        }
        Ok(())
    }
}

impl Tracked for ExperimentRecord {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

impl Record for ExperimentRecord {
    const KIND: RecordKind = RecordKind::Experiment;

    fn key(&self) -> RecordKey {
        RecordKey::experiment(&self.participant_id, &self.experiment_id)
    }
}

fn ensure_fresh(trial: &Trial) -> Result<()> {
    if trial.is_pending() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "only pending trials can be added (trial is {})",
            trial.status()
        )))
    }
}
