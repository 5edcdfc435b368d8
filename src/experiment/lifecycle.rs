//! Lifecycle - status, timing and history of one trial or experiment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::duration::DurationTracker;
use crate::status::{self, Status};
use crate::Result;

/// One entry of a status history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    from: Status,
    to: Status,
    at: DateTime<Utc>,
}

impl StatusChange {
    /// Status before the change.
    #[must_use]
    pub const fn from(&self) -> Status {
        self.from
    }

    /// Status after the change.
    #[must_use]
    pub const fn to(&self) -> Status {
        self.to
    }

    /// When the change happened.
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        self.at
    }
}

/// Status plus the bookkeeping every status change drives.
///
/// The status field is only reachable through [`Lifecycle::transition`],
/// so the transition table and the duration tracker can never disagree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Lifecycle {
    status: Status,
    #[serde(flatten)]
    timing: DurationTracker,
    #[serde(default)]
    status_history: Vec<StatusChange>,
}

impl Lifecycle {
    /// New lifecycle in `pending`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Timing bookkeeping.
    #[must_use]
    pub const fn timing(&self) -> &DurationTracker {
        &self.timing
    }

    /// Every status change, oldest first.
    #[must_use]
    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    /// Move to `target` now.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTransition`] if the table forbids it.
    pub fn transition(&mut self, target: Status) -> Result<()> {
        self.transition_at(target, Utc::now())
    }

    /// Move to `target` at an explicit instant.
    pub(crate) fn transition_at(&mut self, target: Status, at: DateTime<Utc>) -> Result<()> {
        let from = self.status;
        let to = status::transition(from, target)?;
        self.timing.record(from, to, at);
        self.status_history.push(StatusChange { from, to, at });
        self.status = to;
        tracing::debug!(%from, %to, "status changed");
        Ok(())
    }
}

/// Read access shared by everything that carries a [`Lifecycle`].
pub trait Tracked {
    /// The underlying lifecycle.
    fn lifecycle(&self) -> &Lifecycle;

    /// Current status.
    fn status(&self) -> Status {
        self.lifecycle().status()
    }

    /// Status is `pending`.
    fn is_pending(&self) -> bool {
        self.status().is_pending()
    }

    /// Status is `running`.
    fn is_running(&self) -> bool {
        self.status().is_running()
    }

    /// Status is `paused`.
    fn is_paused(&self) -> bool {
        self.status().is_paused()
    }

    /// Status is `timed_out`.
    fn is_timed_out(&self) -> bool {
        self.status().is_timed_out()
    }

    /// Status is `finished`.
    fn is_finished(&self) -> bool {
        self.status().is_finished()
    }

    /// Status is `skipped`.
    fn is_skipped(&self) -> bool {
        self.status().is_skipped()
    }

    /// Status is `finished`, `timed_out` or `skipped`.
    fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Frozen active duration in seconds, once terminal.
    fn duration(&self) -> Option<f64> {
        self.lifecycle().timing().duration()
    }

    /// First start instant.
    fn started_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().timing().started_at()
    }

    /// Terminal instant.
    fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().timing().ended_at()
    }

    /// Every status change, oldest first.
    fn status_history(&self) -> &[StatusChange] {
        self.lifecycle().status_history()
    }
}

impl Tracked for Lifecycle {
    fn lifecycle(&self) -> &Lifecycle {
        self
    }
}
