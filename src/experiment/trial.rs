//! Trial - one stimulus/response unit within an experiment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event_record::EventRecord;
use super::lifecycle::{Lifecycle, Tracked};
use crate::status::Status;
use crate::Result;

/// Trial represents a single presentation within an experiment.
///
/// Trials are never persisted on their own. They live inline in the
/// owning experiment record, and changes made through the experiment are
/// persisted with it.
///
/// `stimulus` and `response` are opaque to this crate; callers decide
/// what goes in them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Trial {
    #[serde(default)]
    trial_number: Option<u32>,
    #[serde(default)]
    block_number: Option<u32>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    practice: bool,
    #[serde(default)]
    stimulus: Option<serde_json::Value>,
    #[serde(default)]
    response: Option<serde_json::Value>,
    #[serde(default)]
    events: Vec<EventRecord>,
    #[serde(flatten)]
    lifecycle: Lifecycle,
}

impl Trial {
    /// Create an empty pending trial.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for a trial with metadata and stimulus.
    #[must_use]
    pub fn builder() -> TrialBuilder {
        TrialBuilder::default()
    }

    /// Trial number within the experiment.
    #[must_use]
    pub const fn trial_number(&self) -> Option<u32> {
        self.trial_number
    }

    /// Block number within the experiment.
    #[must_use]
    pub const fn block_number(&self) -> Option<u32> {
        self.block_number
    }

    /// Experimental condition.
    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Whether this is a practice trial.
    #[must_use]
    pub const fn practice(&self) -> bool {
        self.practice
    }

    /// What is presented to the participant.
    #[must_use]
    pub const fn stimulus(&self) -> Option<&serde_json::Value> {
        self.stimulus.as_ref()
    }

    /// What the participant did.
    #[must_use]
    pub const fn response(&self) -> Option<&serde_json::Value> {
        self.response.as_ref()
    }

    /// Events recorded during this trial.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Replace the stimulus.
    pub fn set_stimulus(&mut self, stimulus: serde_json::Value) {
        self.stimulus = Some(stimulus);
    }

    /// Replace the response.
    pub fn set_response(&mut self, response: serde_json::Value) {
        self.response = Some(response);
    }

    /// Append an event.
    pub fn record_event(&mut self, event: EventRecord) {
        self.events.push(event);
    }

    /// `pending -> running`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] unless pending.
    pub fn start(&mut self) -> Result<()> {
        self.require(Status::Pending, Status::Running)
    }

    /// `paused -> running`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] unless paused.
    pub fn resume(&mut self) -> Result<()> {
        self.require(Status::Paused, Status::Running)
    }

    /// `running -> paused`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] unless running.
    pub fn pause(&mut self) -> Result<()> {
        self.lifecycle.transition(Status::Paused)
    }

    /// `running -> finished`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] unless running.
    pub fn finish(&mut self) -> Result<()> {
        self.lifecycle.transition(Status::Finished)
    }

    /// `running -> timed_out`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] unless running.
    pub fn time_out(&mut self) -> Result<()> {
        self.lifecycle.transition(Status::TimedOut)
    }

    /// `pending -> skipped`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] unless pending.
    pub fn skip(&mut self) -> Result<()> {
        self.lifecycle.transition(Status::Skipped)
    }

    pub(crate) fn transition_at(&mut self, target: Status, at: DateTime<Utc>) -> Result<()> {
        self.lifecycle.transition_at(target, at)
    }

    // `running` is reachable from both pending and paused; start/resume
    // pin down which one the caller meant.
    fn require(&mut self, expected: Status, target: Status) -> Result<()> {
        let current = self.lifecycle.status();
        if current != expected {
            return Err(crate::Error::invalid_transition(current, target));
        }
        self.lifecycle.transition(target)
    }
}

impl Tracked for Trial {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

/// Builder for `Trial`.
#[derive(Debug, Default)]
pub struct TrialBuilder {
    trial_number: Option<u32>,
    block_number: Option<u32>,
    condition: Option<String>,
    practice: bool,
    stimulus: Option<serde_json::Value>,
}

impl TrialBuilder {
    /// Set the trial number.
    #[must_use]
    pub const fn trial_number(mut self, n: u32) -> Self {
        self.trial_number = Some(n);
        self
    }

    /// Set the block number.
    #[must_use]
    pub const fn block_number(mut self, n: u32) -> Self {
        self.block_number = Some(n);
        self
    }

    /// Set the condition label.
    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Mark as a practice trial.
    #[must_use]
    pub const fn practice(mut self, practice: bool) -> Self {
        self.practice = practice;
        self
    }

    /// Set the stimulus.
    #[must_use]
    pub fn stimulus(mut self, stimulus: serde_json::Value) -> Self {
        self.stimulus = Some(stimulus);
        self
    }

    /// Build the pending `Trial`.
    #[must_use]
    pub fn build(self) -> Trial {
        Trial {
            trial_number: self.trial_number,
            block_number: self.block_number,
            condition: self.condition,
            practice: self.practice,
            stimulus: self.stimulus,
            response: None,
            events: Vec::new(),
            lifecycle: Lifecycle::new(),
        }
    }
}
